pub mod client;
pub mod models;
pub mod sqltext;

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

use models::{
    ExecuteSqlRequest, ExecuteSqlResponse, GenerateSqlRequest, GenerateSqlResponse,
    VisualizationRequest, VisualizationResponse,
};

#[derive(Debug)]
pub enum ApiError {
    ConnectionError(String),
    ResponseError { status: u16, message: String },
    DecodeError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ConnectionError(msg) => write!(f, "insights service unreachable: {}", msg),
            ApiError::ResponseError { status, message } => {
                write!(f, "insights service returned status {}: {}", status, message)
            }
            ApiError::DecodeError(msg) => write!(f, "unreadable insights response: {}", msg),
        }
    }
}

impl Error for ApiError {}

impl ApiError {
    /// True when the execution service rejected the query because it names
    /// a schema object that is missing. This is the one signal that feeds
    /// the single-shot regeneration path.
    pub fn is_missing_relation(&self) -> bool {
        matches!(
            self,
            ApiError::ResponseError { message, .. } if message.contains("does not exist")
        )
    }

    /// The raw error text, for passing back to the generation endpoint.
    pub fn message(&self) -> &str {
        match self {
            ApiError::ConnectionError(msg) => msg,
            ApiError::ResponseError { message, .. } => message,
            ApiError::DecodeError(msg) => msg,
        }
    }
}

/// The three request/response contracts the console consumes. The remote
/// implementation lives in [`client`]; tests substitute scripted fakes.
#[async_trait]
pub trait InsightsApi: Send + Sync {
    async fn generate_sql(
        &self,
        request: &GenerateSqlRequest,
    ) -> Result<GenerateSqlResponse, ApiError>;

    async fn execute_sql(
        &self,
        request: &ExecuteSqlRequest,
    ) -> Result<ExecuteSqlResponse, ApiError>;

    async fn generate_visualizations(
        &self,
        request: &VisualizationRequest,
    ) -> Result<VisualizationResponse, ApiError>;
}
