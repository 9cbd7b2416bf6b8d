use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod charts;
mod config;
mod connection;
mod export;
mod session;
mod util;
mod web;

use crate::api::client::InsightsClient;
use crate::config::{AppConfig, CliArgs};
use crate::connection::ConnectionStore;
use crate::session::service::QueryConsole;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Ensure the storage directory exists
    let storage_dir = PathBuf::from(&config.storage_dir);
    if !storage_dir.exists() {
        info!("Creating storage directory: {}", config.storage_dir);
        std::fs::create_dir_all(&storage_dir)?;
    }

    info!("Using insights service at {}", config.api.base_url);
    let backend = Arc::new(InsightsClient::new(&config.api)?);

    let connections = Arc::new(ConnectionStore::new(&storage_dir));
    let console = QueryConsole::new(backend, Arc::clone(&connections));

    // Create application state
    let app_state = Arc::new(AppState::new(config.clone(), console, connections));

    // Start the web server
    info!(
        "Starting InsightBot server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            )) as Box<dyn std::error::Error>);
        }
    }

    Ok(())
}
