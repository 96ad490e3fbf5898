//!
//! Configuration loading system for histguard.
//!
//! Sources are layered through a builder, each overriding the ones before it:
//! 1. Built-in defaults (lowest priority)
//! 2. System config file (/etc/histguard/config.toml)
//! 3. User config file (~/.config/histguard/config.toml)
//! 4. Explicit config file
//! 5. Environment variables (highest priority)
//!
//! Files are merged key by key, so a later file only overrides the keys it sets.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use crate::config::paths;
use crate::config::{Config, LogLevel};
use crate::error::{Result, SanitizeError};

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

/* --- constants ------------------------------------------------------------------------------- */

/// Prefix of environment variables read by the loader
pub const ENV_PREFIX: &str = "HISTGUARD_";

/* --- types ----------------------------------------------------------------------------------- */

///
/// Configuration loader implementing the Builder pattern.
///
/// Each method returns self for chaining.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Merged file layers
    table: toml::Table,
    /// Environment variable overrides collected
    env_overrides: BTreeMap<String, String>,
    /// Whether defaults have been applied
    defaults_applied: bool,
}

/* --- implementations --------------------------------------------------------------------- */

impl ConfigLoader {
    /// Create a new configuration loader
    ///
    /// # Examples
    /// ```rust,no_run
    /// use histguard::config::loader::ConfigLoader;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ConfigLoader::new()
    ///     .with_defaults()
    ///     .with_user_config()?
    ///     .with_env_vars()?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> Self {
        Self { table: toml::Table::new(), env_overrides: BTreeMap::new(), defaults_applied: false }
    }

    /// Apply built-in default values
    ///
    /// This should be called first in the loading chain.
    pub fn with_defaults(mut self) -> Self {
        self.table = toml::Table::new();
        self.defaults_applied = true;
        self
    }

    /// Load the system-wide configuration file, if this platform has one and it exists
    pub fn with_system_config(mut self) -> Result<Self> {
        if let Ok(path) = paths::system_config_file() {
            self.load_optional_layer("system", &path)?;
        }
        Ok(self)
    }

    /// Load the user configuration file, if it exists
    pub fn with_user_config(mut self) -> Result<Self> {
        let path = paths::user_config_file()?;
        self.load_optional_layer("user", &path)?;
        Ok(self)
    }

    /// Load configuration from a specific file; the file must exist
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(layer = "explicit", path = %path.display(), "Loading config layer");
        self.load_config_file(path)?;
        Ok(self)
    }

    /// Collect `HISTGUARD_*` environment variables
    ///
    /// Supported environment variables:
    /// - HISTGUARD_LOG_LEVEL
    /// - HISTGUARD_SESSION_DIR
    /// - HISTGUARD_SCOPE_TAG
    /// - HISTGUARD_LOG_MARKER_FAILURES
    /// - HISTGUARD_MAX_IMAGE_BYTES
    /// - HISTGUARD_ALLOWED_MIME_TYPES (comma separated)
    pub fn with_env_vars(mut self) -> Result<Self> {
        tracing::debug!("Loading configuration from environment variables");

        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                self.env_overrides.insert(key, value);
            }
        }

        Ok(self)
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<Config> {
        let config = self.build_unvalidated()?;
        config.validate()?;

        tracing::debug!(
            "Final config: log_level={:?}, session.dir={:?}, max_image_bytes={}",
            config.logging.log_level,
            config.session.dir,
            config.images.max_image_bytes
        );
        Ok(config)
    }

    /// Build the configuration without validating it
    ///
    /// Used by `config validate`, which reports validation problems itself.
    pub fn build_unvalidated(self) -> Result<Config> {
        if !self.defaults_applied {
            return Err(SanitizeError::Config(
                "Configuration loader must call with_defaults() before build()".to_string(),
            ));
        }

        let mut config: Config = toml::Value::Table(self.table).try_into().map_err(
            |e: toml::de::Error| SanitizeError::Config(format!("Invalid configuration: {}", e)),
        )?;
        apply_env_overrides(&mut config, &self.env_overrides)?;
        Ok(config)
    }

    /* --- private methods ----------------------------------------------------------------- */

    fn load_optional_layer(&mut self, layer: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            tracing::debug!(layer, path = %path.display(), "Config layer not present");
            return Ok(());
        }
        tracing::debug!(layer, path = %path.display(), "Loading config layer");
        self.load_config_file(path)
    }

    /// Load a TOML file and merge it over the current layers
    fn load_config_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();

        paths::validate_config_file(path)?;

        let contents = std::fs::read_to_string(path).map_err(|e| {
            SanitizeError::Config(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let file_table: toml::Table = toml::from_str(&contents).map_err(|e| {
            SanitizeError::Config(format!(
                "Failed to parse TOML configuration file '{}': {}\n\
                 \n\
                 Run 'histguard config validate' for more details.",
                path.display(),
                e
            ))
        })?;

        // reject unknown value types early, with the file name in the message
        toml::Value::Table(file_table.clone()).try_into::<Config>().map_err(|e| {
            SanitizeError::Config(format!(
                "Invalid configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        merge_tables(&mut self.table, file_table);
        tracing::debug!(path = %path.display(), keys = self.table.len(), "Merged config layer");
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/* --- utility functions ------------------------------------------------------------------- */

/// Deep-merge `overlay` into `base`; nested tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Apply collected environment variables to a built configuration
fn apply_env_overrides(config: &mut Config, overrides: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "HISTGUARD_LOG_LEVEL" => {
                config.logging.log_level = LogLevel::parse(value)?;
            }
            "HISTGUARD_SESSION_DIR" => {
                config.session.dir = Some(value.clone()).filter(|dir| !dir.is_empty());
            }
            "HISTGUARD_SCOPE_TAG" => {
                config.sanitizer.scope_tag = value.clone();
            }
            "HISTGUARD_LOG_MARKER_FAILURES" => {
                config.sanitizer.log_marker_failures = parse_bool_env(value, key)?;
            }
            "HISTGUARD_MAX_IMAGE_BYTES" => {
                config.images.max_image_bytes = value.parse().map_err(|e| {
                    SanitizeError::Config(format!(
                        "Invalid HISTGUARD_MAX_IMAGE_BYTES value '{}': {}",
                        value, e
                    ))
                })?;
            }
            "HISTGUARD_ALLOWED_MIME_TYPES" => {
                config.images.allowed_mime_types = value
                    .split(',')
                    .map(str::trim)
                    .filter(|mime| !mime.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                tracing::debug!("Ignoring unknown environment variable: {}", key);
            }
        }
    }
    Ok(())
}

/// Parse boolean value from environment variable
fn parse_bool_env(value: &str, var_name: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" | "enabled" => Ok(true),
        "false" | "no" | "0" | "off" | "disabled" => Ok(false),
        _ => Err(SanitizeError::Config(format!(
            "Invalid boolean value for {}: '{}'\n\
             Valid values: true/false, yes/no, 1/0, on/off, enabled/disabled",
            var_name, value
        ))),
    }
}

/* --- tests ------------------------------------------------------------------------------- */
