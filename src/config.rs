//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. `config/stream.toml` (base configuration)
//! 2. Environment variables (prefixed with `SENSOR_STREAM_`, nested keys split on `__`)
//!
//! # Example
//! ```no_run
//! use sensor_stream::config::StreamConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamConfig::load()?;
//! println!("Application: {}", config.application.name);
//! # Ok(())
//! # }
//! ```
//!
//! # File layout
//! ```toml
//! [application]
//! name = "Sensor Stream"
//! log_level = "info"
//!
//! [[channels]]
//! key = "main"
//! label = "+Value"
//! channel_scale = 0.000125
//! offset2_step = 1.0
//! window_size = 99
//!
//! [channels.corrector]
//! slope_mismatch_max = 0.5
//! base_noise_y = 0.01
//! k_slope = 1.0
//! k_curve = 1.0
//! cooldown_samples = 2
//! ```

use crate::channel::ChannelKey;
use crate::data::extractor::ExtractorConfig;
use crate::error::{AppResult, StreamError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file.
pub const DEFAULT_PATH: &str = "config/stream.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SENSOR_STREAM_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Channel definitions
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelDefinition>,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One logical channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    /// Which channel this is
    pub key: ChannelKey,
    /// Scaling, window and detector settings
    #[serde(flatten)]
    pub extractor: ExtractorConfig,
}

// Default value functions
fn default_name() -> String {
    "Sensor Stream".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channels() -> Vec<ChannelDefinition> {
    vec![ChannelDefinition {
        key: ChannelKey::Main,
        extractor: ExtractorConfig::default(),
    }]
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            application: ApplicationConfig::default(),
            channels: default_channels(),
        }
    }
}

impl StreamConfig {
    /// Load configuration from `config/stream.toml` and environment variables
    ///
    /// Environment variables can override configuration with prefix `SENSOR_STREAM_`
    /// Example: `SENSOR_STREAM_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_PATH)
    }

    /// Load configuration from a specific file path, on top of the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(text: &str) -> AppResult<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(text))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(StreamError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.channels.is_empty() {
            return Err(StreamError::Configuration(
                "At least one channel must be configured".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for channel in &self.channels {
            if !keys.insert(channel.key) {
                return Err(StreamError::Configuration(format!(
                    "Duplicate channel key: {}",
                    channel.key
                )));
            }
            channel.extractor.validate().map_err(|e| {
                StreamError::Configuration(format!("Channel '{}': {}", channel.key, e))
            })?;
        }

        Ok(())
    }

    /// Definition for `key`, if configured
    pub fn channel(&self, key: ChannelKey) -> Option<&ChannelDefinition> {
        self.channels.iter().find(|c| c.key == key)
    }
}
