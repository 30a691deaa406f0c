//! Serializer configuration, loaded from TOML.
//!
//! ```toml
//! path = "saves/slot1.ron"
//! format = "ron"          # or "bincode"
//! schema_version = 3
//! load_phases = 2
//! ```
//!
//! Every key is optional.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::SchemaVersion;
use crate::serialize::Format;

/// Fewest load phases that still separate spawning from linking.
pub const MIN_LOAD_PHASES: u32 = 2;

/// Settings for one [`Serializer`](crate::Serializer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Storage path of the save document.
    pub path: String,
    /// Document encoding.
    pub format: Format,
    /// Schema version of this build. Writes target it; reads reject newer.
    pub schema_version: u32,
    /// Number of load passes, at least [`MIN_LOAD_PHASES`].
    pub load_phases: u32,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            path: "save.ron".into(),
            format: Format::Ron,
            schema_version: 1,
            load_phases: MIN_LOAD_PHASES,
        }
    }
}

impl PersistConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_load_phases(mut self, phases: u32) -> Self {
        self.load_phases = phases;
        self
    }

    pub fn schema_version(&self) -> SchemaVersion {
        SchemaVersion::new(self.schema_version)
    }

    /// Effective number of load phases, clamped to [`MIN_LOAD_PHASES`].
    pub fn load_phases(&self) -> u32 {
        if self.load_phases < MIN_LOAD_PHASES {
            log::warn!(
                "load_phases = {} is below the minimum, using {MIN_LOAD_PHASES}",
                self.load_phases
            );
            return MIN_LOAD_PHASES;
        }
        self.load_phases
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!(
            "Loaded persistence config from {}: {} ({}, schema v{})",
            path.display(),
            config.path,
            config.format,
            config.schema_version
        );
        Ok(config)
    }

    /// Load a config, falling back to defaults if the file is missing or bad.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("No persistence config ({e}), using defaults");
                Self::default()
            }
        }
    }
}

/// Errors raised while loading a [`PersistConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: String,
        source: std::io::Error,
    },
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "failed to read {path}: {source}"),
            ConfigError::Parse(msg) => write!(f, "failed to parse config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(_) => None,
        }
    }
}
