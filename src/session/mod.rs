pub mod service;
pub mod tabs;

use crate::api::ApiError;
use crate::connection::StoreError;
use crate::export::ExportError;
use std::error::Error;
use std::fmt;

/// Everything a console action can fail with. All of these surface as a
/// user-visible notice; the session itself stays usable.
#[derive(Debug)]
pub enum ConsoleError {
    /// No connection profile has been saved yet.
    ConfigurationMissing,
    /// Execute was requested while the tab's SQL is empty.
    NoQueryToRun,
    TabNotFound(u64),
    Generation(ApiError),
    Execution(ApiError),
    Visualization(ApiError),
    Export(ExportError),
    Store(StoreError),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::ConfigurationMissing => write!(
                f,
                "No database connection configured. Please connect to a database first."
            ),
            ConsoleError::NoQueryToRun => {
                write!(f, "No SQL query to run. Generate a query first.")
            }
            ConsoleError::TabNotFound(id) => write!(f, "Tab {} no longer exists", id),
            ConsoleError::Generation(e) => write!(f, "Failed to generate SQL query: {}", e),
            ConsoleError::Execution(e) => write!(f, "Error executing SQL query: {}", e),
            ConsoleError::Visualization(e) => {
                write!(f, "Failed to generate visualizations: {}", e)
            }
            ConsoleError::Export(e) => write!(f, "{}", e),
            ConsoleError::Store(e) => write!(f, "Failed to read connection settings: {}", e),
        }
    }
}

impl Error for ConsoleError {}

impl From<ExportError> for ConsoleError {
    fn from(e: ExportError) -> Self {
        ConsoleError::Export(e)
    }
}

impl From<StoreError> for ConsoleError {
    fn from(e: StoreError) -> Self {
        ConsoleError::Store(e)
    }
}
