//! Loader configuration.
//!
//! Sources, later ones overriding earlier ones:
//! - built-in defaults
//! - `bicep-schema.toml` in the working directory, if present
//! - an explicit config file
//! - environment variables (`BICEP_SCHEMA_*`)
//!
//! ## Example config file (bicep-schema.toml):
//! ```toml
//! base_url = "https://raw.githubusercontent.com/Azure/bicep-types-az/refs/heads/main/generated"
//! cache_ttl_secs = 86400
//! http_timeout_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Root of the published Azure type definitions.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/Azure/bicep-types-az/refs/heads/main/generated";

const DEFAULT_CONFIG_FILE: &str = "bicep-schema.toml";
const ENV_PREFIX: &str = "BICEP_SCHEMA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// URL that `index.json` and all type files are relative to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Lifetime of cached index and type entries, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Per-request HTTP timeout, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, additionally reading a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(config_path, Environment::with_prefix(ENV_PREFIX))
    }

    fn build(config_path: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(environment.try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Message(format!(
                "base_url must be an http(s) URL, got \"{}\"",
                self.base_url
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
