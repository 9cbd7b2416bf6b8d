use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::models::SchemaSnapshot;
use crate::connection::{ConnectionProfile, ConnectionSummary};
use crate::session::service::{ExecutionReport, TabPatch};
use crate::session::tabs::{Tab, Tabs};
use crate::session::ConsoleError;
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub filename: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub tab_count: usize,
    pub api_base: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

fn error_response(e: ConsoleError) -> (StatusCode, String) {
    let status = match &e {
        ConsoleError::ConfigurationMissing | ConsoleError::NoQueryToRun => StatusCode::BAD_REQUEST,
        ConsoleError::TabNotFound(_) => StatusCode::NOT_FOUND,
        ConsoleError::Export(_) => StatusCode::BAD_REQUEST,
        ConsoleError::Generation(_)
        | ConsoleError::Execution(_)
        | ConsoleError::Visualization(_) => StatusCode::BAD_GATEWAY,
        ConsoleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("{}", e);
    (status, e.to_string())
}

// Tab session management

pub async fn list_tabs(state: State<Arc<AppState>>) -> Json<Tabs> {
    Json(state.console.tabs_view().await)
}

pub async fn add_tab(state: State<Arc<AppState>>) -> impl IntoResponse {
    let tab = state.console.add_tab().await;
    info!("Opened tab {} ({})", tab.id, tab.name);
    (StatusCode::CREATED, Json(tab))
}

pub async fn close_tab(state: State<Arc<AppState>>, Path(id): Path<u64>) -> Json<Tabs> {
    if !state.console.close_tab(id).await {
        debug!("Ignoring close for tab {}", id);
    }
    Json(state.console.tabs_view().await)
}

pub async fn activate_tab(state: State<Arc<AppState>>, Path(id): Path<u64>) -> Json<Tabs> {
    if !state.console.activate_tab(id).await {
        debug!("Ignoring activation of unknown tab {}", id);
    }
    Json(state.console.tabs_view().await)
}

pub async fn update_tab(
    state: State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(patch): Json<TabPatch>,
) -> Result<Json<Tab>, (StatusCode, String)> {
    let tab = state
        .console
        .patch_tab(id, patch)
        .await
        .map_err(error_response)?;
    Ok(Json(tab))
}

// Query pipeline

pub async fn generate_sql(
    state: State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<Tab>, (StatusCode, String)> {
    info!("Generating SQL on tab {}: {}", id, payload.question);
    let tab = state
        .console
        .generate(id, payload.question)
        .await
        .map_err(error_response)?;
    Ok(Json(tab))
}

pub async fn execute_sql(
    state: State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ExecutionReport>, (StatusCode, String)> {
    info!("Executing SQL on tab {}", id);
    let report = state.console.execute(id).await.map_err(error_response)?;
    Ok(Json(report))
}

pub async fn export_csv(
    state: State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<ExportParams>,
) -> Result<Response, (StatusCode, String)> {
    let csv = state.console.export_csv(id).await.map_err(error_response)?;

    let filename = params
        .filename
        .unwrap_or_else(|| "export.csv".to_string())
        .replace(['"', '\r', '\n'], "");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    info!("Exporting tab {} results as {}", id, filename);
    Ok((headers, csv).into_response())
}

// Connection profile

pub async fn save_connection(
    state: State<Arc<AppState>>,
    Json(profile): Json<ConnectionProfile>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.connections.save(&profile).map_err(|e| {
        error!("Failed to save connection profile: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save connection profile".to_string(),
        )
    })?;

    info!(
        "Saved connection profile \"{}\" for {}@{}:{}/{}",
        profile.name, profile.username, profile.host, profile.port, profile.database
    );
    Ok((StatusCode::CREATED, Json(profile.summary())))
}

pub async fn get_connection(
    state: State<Arc<AppState>>,
) -> Result<Json<ConnectionStatus>, (StatusCode, String)> {
    let profile = state.connections.current().map_err(|e| {
        error!("Failed to read connection profile: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to read connection profile".to_string(),
        )
    })?;

    Ok(Json(ConnectionStatus {
        connected: profile.is_some(),
        connection: profile.map(|p| p.summary()),
    }))
}

pub async fn delete_connection(
    state: State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let removed = state.connections.clear().map_err(|e| {
        error!("Failed to remove connection profile: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to remove connection profile".to_string(),
        )
    })?;

    if removed {
        info!("Removed stored connection profile");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            "No connection profile stored".to_string(),
        ))
    }
}

// Schema

pub async fn get_schema(state: State<Arc<AppState>>) -> Json<SchemaSnapshot> {
    Json(state.console.schema().await)
}

// System status

pub async fn system_status(state: State<Arc<AppState>>) -> Json<SystemStatus> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    let profile = state.connections.current().ok().flatten();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        tab_count: state.console.tab_count().await,
        api_base: state.config.api.base_url.clone(),
        connected: profile.is_some(),
        database: profile.map(|p| p.database),
    })
}
