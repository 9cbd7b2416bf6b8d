use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the insights service hosting the generate-sql,
    /// raw-sql and generate-visualizations endpoints.
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub api: ApiConfig,
    pub storage_dir: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for persisted console state
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Base URL of the insights service
    #[arg(long)]
    pub api_url: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Start from built-in defaults so the console runs without a file
        let mut config_builder = Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 3000)?
            .set_default("api.base_url", "http://localhost:8000")?
            .set_default("api.timeout_secs", 60)?
            .set_default("storage_dir", "data")?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/insightbot/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // Build the config
        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(storage_dir) = &args.storage_dir {
            config.storage_dir = storage_dir.clone();
        }
        if let Some(api_url) = &args.api_url {
            config.api.base_url = api_url.clone();
        }

        Ok(config)
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 60,
            },
            storage_dir: "data".to_string(),
        }
    }
}
