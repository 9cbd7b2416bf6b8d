use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::static_files::static_handler;
use super::state::AppState;

// UI Routes - web interface
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::ui::index_handler))
        .route("/console", get(handlers::ui::console_handler))
        .route("/static/{*path}", get(static_handler))
        .fallback(handlers::ui::not_found_handler)
}

// API Routes - REST API the console front-end talks to
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Tab session management
            .route("/tabs", get(handlers::api::list_tabs))
            .route("/tabs", post(handlers::api::add_tab))
            .route("/tabs/{id}", delete(handlers::api::close_tab))
            .route("/tabs/{id}", patch(handlers::api::update_tab))
            .route("/tabs/{id}/activate", post(handlers::api::activate_tab))
            // Query pipeline
            .route("/tabs/{id}/generate", post(handlers::api::generate_sql))
            .route("/tabs/{id}/execute", post(handlers::api::execute_sql))
            .route("/tabs/{id}/export", get(handlers::api::export_csv))
            // Connection profile
            .route("/connection", post(handlers::api::save_connection))
            .route("/connection", get(handlers::api::get_connection))
            .route("/connection", delete(handlers::api::delete_connection))
            // Schema and status
            .route("/schema", get(handlers::api::get_schema))
            .route("/status", get(handlers::api::system_status)),
    )
}
