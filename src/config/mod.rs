//! Configuration management module.
//!
//! Supports loading configuration from:
//! - TOML or JSON files (config/default, config/{profile}, `SID_CONFIG`)
//! - Environment variables with `SID__<SECTION>__<KEY>` pattern

mod backend;
mod server;

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::SequenceDefinition;

pub use backend::{
    BackendConfig, BackendDriver, DEFAULT_TOKEN_WIDTH, FileBackendConfig, MAX_TOKEN_WIDTH,
    MySqlBackendConfig,
};
pub use server::ServerConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Configured sequences, keyed by name.
    #[serde(default)]
    pub sequences: BTreeMap<String, SequenceSettings>,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `config/default`
    /// 2. `config/{SID_PROFILE}` (`development` when unset)
    /// 3. The file named by `SID_CONFIG`, if set
    /// 4. Environment variables with `SID__` prefix
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let profile = std::env::var("SID_PROFILE").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{profile}")).required(false));

        if let Ok(path) = std::env::var("SID_CONFIG") {
            builder = builder.add_source(File::from(Path::new(&path)).required(true));
        }

        // SID__SERVER__PORT=8080 -> server.port = 8080
        let config = builder
            .add_source(
                Environment::with_prefix("SID")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config)
    }

    /// Load configuration from a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the configuration is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".to_string()));
        }

        self.backend.validate()?;

        if self.sequences.is_empty() {
            return Err(ConfigError::Message(
                "at least one sequence must be configured".to_string(),
            ));
        }

        for (name, settings) in &self.sequences {
            if let Some(width) = settings.token_width {
                backend::validate_token_width(&format!("sequences.{name}.token_width"), width)?;
            }
        }

        Ok(())
    }

    /// Resolve the configured sequences into provisioning definitions.
    #[must_use]
    pub fn sequence_definitions(&self) -> Vec<SequenceDefinition> {
        self.sequences
            .iter()
            .map(|(name, settings)| {
                SequenceDefinition::new(
                    name.clone(),
                    settings.token_width.unwrap_or(self.backend.token_width),
                )
            })
            .collect()
    }
}

/// Per-sequence settings.
///
/// Most deployments leave this empty (`"jobs": {}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceSettings {
    /// Override of `backend.token_width` for this sequence.
    #[serde(default)]
    pub token_width: Option<u16>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Enable Prometheus metrics endpoint.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const fn default_metrics_enabled() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: true,
        }
    }
}
