//! Runtime configuration
//!
//! Tuning knobs are read from TOML:
//!
//! ```toml
//! [handles]
//! customize_threshold = 127   # -1 never customizes, 0 customizes on first call
//!
//! [lookup]
//! default_modes = "PUBLIC|PRIVATE|PROTECTED|PACKAGE"
//! ```
//!
//! The process-wide configuration is installed at most once; until then the
//! defaults apply.

use std::path::Path;

use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lookup::AccessMode;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range or malformed
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Invocation target settings
    #[serde(default)]
    pub handles: HandleConfig,

    /// Resolver settings
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// Invocation target settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandleConfig {
    /// Exact invocations of a bound target before its form is customized
    #[serde(default = "default_customize_threshold")]
    pub customize_threshold: i32,
}

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupConfig {
    /// Capabilities of a freshly created lookup, in `A|B` form
    #[serde(default = "default_lookup_modes")]
    pub default_modes: String,
}

fn default_customize_threshold() -> i32 {
    127
}

fn default_lookup_modes() -> String {
    "PUBLIC|PRIVATE|PROTECTED|PACKAGE".to_string()
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            customize_threshold: default_customize_threshold(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            default_modes: default_lookup_modes(),
        }
    }
}

static RUNTIME_CONFIG: OnceCell<RuntimeConfig> = OnceCell::new();
static DEFAULT_CONFIG: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::default);

impl RuntimeConfig {
    /// Parse configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handles.customize_threshold < -1 {
            return Err(ConfigError::ValidationError(format!(
                "customize_threshold must be -1 or greater, got {}",
                self.handles.customize_threshold
            )));
        }
        match self.default_modes() {
            None => Err(ConfigError::ValidationError(format!(
                "Unknown lookup modes: {}",
                self.lookup.default_modes
            ))),
            Some(modes) if modes.is_trusted() => Err(ConfigError::ValidationError(
                "default_modes cannot be TRUSTED".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Parsed default lookup capabilities
    pub fn default_modes(&self) -> Option<AccessMode> {
        AccessMode::from_combined_str(&self.lookup.default_modes)
    }

    /// Install as the process-wide configuration
    ///
    /// Fails (returning the rejected value) if a configuration was already
    /// installed. Callers that read [`runtime`] before installing keep the
    /// defaults they observed.
    pub fn install(self) -> Result<(), RuntimeConfig> {
        RUNTIME_CONFIG.set(self)
    }
}

/// The process-wide configuration (defaults unless one was installed)
pub fn runtime() -> &'static RuntimeConfig {
    RUNTIME_CONFIG.get().unwrap_or(&DEFAULT_CONFIG)
}
