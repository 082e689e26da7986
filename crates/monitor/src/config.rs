//! Monitor configuration
//!
//! Loaded from an optional TOML file, then overridden by `DMS_`-prefixed
//! environment variables (`DMS_DMS__EAR_THRESHOLD=0.18`).

use crate::MonitorError;
use alerting::AlertConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, Level};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl LoggingConfig {
    /// Parsed maximum level
    pub fn max_level(&self) -> Result<Level, MonitorError> {
        self.level
            .parse::<Level>()
            .map_err(|_| MonitorError::LogLevel(self.level.clone()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub dms: DmsConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
    /// Calibrate before monitoring starts
    pub perform_calibration: bool,
}

impl MonitorConfig {
    /// Load configuration from file (if any) and environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        Self::load_with_prefix(path, "DMS")
    }

    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, MonitorError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: MonitorConfig = builder.build()?.try_deserialize()?;
        config.dms.validate()?;
        config.logging.max_level()?;
        Ok(config)
    }
}
