use crate::config::AppConfig;
use crate::connection::ConnectionStore;
use crate::session::service::QueryConsole;
use crate::web::templates::init_templates;
use minijinja::Environment;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub template_env: Environment<'static>,
    pub console: QueryConsole,
    pub connections: Arc<ConnectionStore>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        console: QueryConsole,
        connections: Arc<ConnectionStore>,
    ) -> Self {
        Self {
            config,
            template_env: init_templates(),
            console,
            connections,
            startup_time: chrono::Utc::now(),
        }
    }
}
