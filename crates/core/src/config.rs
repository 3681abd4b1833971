//! Configuration loaded from a TOML file
//!
//! Every section is optional; missing keys fall back to defaults so an empty
//! file is a valid configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::Service;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub rooms: RoomsConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; the platform data directory is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7341".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Deadline applied to every room operation
    pub request_timeout_ms: u64,
    /// Hex characters kept from the code digest
    pub invitation_code_length: usize,
    /// Fresh digests tried before giving up on a code
    pub invitation_code_attempts: u32,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            invitation_code_length: 7,
            invitation_code_attempts: 5,
        }
    }
}

impl RoomsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Services and plans seeded into storage on startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub services: Vec<Service>,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // A SHA-256 hex digest has 64 characters
        if !(1..=64).contains(&self.rooms.invitation_code_length) {
            return Err(Error::InvalidInput(format!(
                "invitation_code_length must be between 1 and 64, got {}",
                self.rooms.invitation_code_length
            )));
        }
        if self.rooms.invitation_code_attempts == 0 {
            return Err(Error::InvalidInput(
                "invitation_code_attempts must be at least 1".into(),
            ));
        }
        for service in &self.catalog.services {
            if let Some(plan) = service.plans.iter().find(|p| p.max_count == 0) {
                return Err(Error::InvalidInput(format!(
                    "plan {} of service {} has max_count 0",
                    plan.name, service.name
                )));
            }
        }
        Ok(())
    }

    /// Database path, resolving the platform default when unset
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("splitroom.db")),
        }
    }

    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("splitroom.toml"))
    }

    fn data_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "splitroom", "splitroom").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })
    }
}
