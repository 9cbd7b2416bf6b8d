use crate::api::models::{
    ApiErrorBody, ExecuteSqlRequest, ExecuteSqlResponse, GenerateSqlRequest, GenerateSqlResponse,
    VisualizationRequest, VisualizationResponse,
};
use crate::api::{ApiError, InsightsApi};
use crate::config::ApiConfig;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the remote insights service.
pub struct InsightsClient {
    client: reqwest::Client,
    generate_url: String,
    execute_url: String,
    visualize_url: String,
}

impl InsightsClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConnectionError(e.to_string()))?;

        let base = config.base_url.trim_end_matches('/');

        Ok(Self {
            client,
            generate_url: format!("{}/api/generate-sql/", base),
            execute_url: format!("{}/api/raw-sql/", base),
            visualize_url: format!("{}/api/generate-visualizations/", base),
        })
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Pull the service's own error text out of the body when it
            // sends one; the raw body is still better than nothing.
            let message = match response.text().await {
                Ok(text) => extract_error_message(&text),
                Err(_) => String::new(),
            };
            return Err(ApiError::ResponseError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ApiError::DecodeError(e.to_string()))
    }
}

fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody { error: Some(message) }) => message,
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl InsightsApi for InsightsClient {
    async fn generate_sql(
        &self,
        request: &GenerateSqlRequest,
    ) -> Result<GenerateSqlResponse, ApiError> {
        info!("Requesting SQL generation for: {}", request.natural_language);
        self.post_json(&self.generate_url, request).await
    }

    async fn execute_sql(
        &self,
        request: &ExecuteSqlRequest,
    ) -> Result<ExecuteSqlResponse, ApiError> {
        info!("Executing SQL: {}", request.query);
        self.post_json(&self.execute_url, request).await
    }

    async fn generate_visualizations(
        &self,
        request: &VisualizationRequest,
    ) -> Result<VisualizationResponse, ApiError> {
        debug!(
            "Requesting visualizations for {} rows",
            request.dataset.len()
        );
        self.post_json(&self.visualize_url, request).await
    }
}
