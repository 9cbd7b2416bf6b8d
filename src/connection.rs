use crate::api::models::DbConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The saved database connection details the remote services run queries
/// against. Stored as a single JSON document under the storage directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Display name for the connection, e.g. "My Database".
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub port: String,
    pub database: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

/// What status endpoints report about the saved profile. The password is
/// write-only and never leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub name: String,
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    pub saved_at: DateTime<Utc>,
}

impl ConnectionProfile {
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            saved_at: self.saved_at,
        }
    }

    /// The shape the remote contracts expect. A blank port falls back to
    /// the Postgres default.
    pub fn db_config(&self) -> DbConfig {
        let port = if self.port.trim().is_empty() {
            "5432".to_string()
        } else {
            self.port.trim().to_string()
        };
        DbConfig {
            name: self.database.clone(),
            user: self.username.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port,
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Connection store I/O error: {}", e),
            StoreError::Serde(e) => write!(f, "Connection store serialization error: {}", e),
        }
    }
}

impl Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

/// File-backed store for the single connection profile. Readers go back to
/// disk on every call so edits made while queries are in flight are picked
/// up by the next request.
pub struct ConnectionStore {
    path: PathBuf,
}

impl ConnectionStore {
    pub fn new(storage_dir: &Path) -> ConnectionStore {
        ConnectionStore {
            path: storage_dir.join("connection.json"),
        }
    }

    pub fn save(&self, profile: &ConnectionProfile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, json)?;
        debug!("Saved connection profile to {}", self.path.display());
        Ok(())
    }

    pub fn current(&self) -> Result<Option<ConnectionProfile>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let profile = serde_json::from_str(&raw)?;
        Ok(Some(profile))
    }

    pub fn clear(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed connection profile at {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
