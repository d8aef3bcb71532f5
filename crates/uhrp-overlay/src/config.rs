//! Configuration for the UHRP overlay services

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uhrp_storage::RedbStorageConfig;

use crate::error::OverlayError;

/// Default topic name the topic manager admits into
pub const DEFAULT_TOPIC: &str = "tm_uhrp";

/// Default lookup service name
pub const DEFAULT_LOOKUP_SERVICE: &str = "ls_uhrp";

/// Configuration shared by the topic manager and lookup service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Topic both components are bound to
    pub topic: String,
    /// Name the lookup service is registered under
    pub lookup_service: String,
    /// Commitment index storage
    pub storage: RedbStorageConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            lookup_service: DEFAULT_LOOKUP_SERVICE.to_string(),
            storage: RedbStorageConfig::default(),
        }
    }
}

impl OverlayConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, OverlayError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OverlayError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Set the topic name
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the lookup service name
    pub fn with_lookup_service(mut self, name: impl Into<String>) -> Self {
        self.lookup_service = name.into();
        self
    }

    /// Set the storage configuration
    pub fn with_storage(mut self, storage: RedbStorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set the database path, keeping the other storage settings
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.storage.db_path = db_path.into();
        self
    }
}
