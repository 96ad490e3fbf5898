//!
//! Configuration management for histguard.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! - built-in defaults
//! - system config file (`/etc/histguard/config.toml`)
//! - user config file (platform config directory)
//! - an explicit config file passed on the command line
//! - `HISTGUARD_*` environment variables
//!
//! Submodules:
//! - `loader.rs` - layered loading
//! - `paths.rs` - platform-native path resolution
//! - `validation.rs` - value validation
//! - `cli.rs` - `config` subcommands
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod cli;
pub mod loader;
pub mod paths;
pub mod validation;

/* --- uses ------------------------------------------------------------------------------------ */

use std::path::{Path, PathBuf};

use crate::error::{Result, SanitizeError};
use serde::{Deserialize, Serialize};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Main application configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Session log storage
    #[serde(default)]
    pub session: SessionConfig,
    /// Pipeline behavior
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    /// Default image sanitizer limits
    #[serde(default)]
    pub images: ImageConfig,
}

///
/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Application logging level
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

///
/// Session log storage.
///
/// When `dir` is set, each session gets a `<dir>/<safe-session-id>-<hash>.jsonl` log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding per-session JSONL logs; supports `~` and `$VAR`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

///
/// Pipeline behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Scope tag handed to the image sanitizer
    #[serde(default = "default_scope_tag")]
    pub scope_tag: String,
    /// Log swallowed turn-ordering marker failures at debug level
    #[serde(default = "default_log_marker_failures")]
    pub log_marker_failures: bool,
}

///
/// Limits applied by the default image sanitizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Largest decoded image accepted, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Accepted mime types (case-insensitive)
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

///
/// Logging level enumeration.
///
/// Defines available log levels compatible with tracing crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/* --- defaults -------------------------------------------------------------------------------- */

/// Default logging level
fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Default image sanitizer scope
fn default_scope_tag() -> String {
    "session:history".to_string()
}

fn default_log_marker_failures() -> bool {
    true
}

/// Default image limit (5MB)
fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_allowed_mime_types() -> Vec<String> {
    ["image/png", "image/jpeg", "image/gif", "image/webp"].iter().map(|m| m.to_string()).collect()
}

/* --- implementations --------------------------------------------------------------------- */

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self { scope_tag: default_scope_tag(), log_marker_failures: default_log_marker_failures() }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

impl Config {
    /// Load configuration from the standard hierarchy:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (~/.config/histguard/config.toml)
    /// 3. System config file (/etc/histguard/config.toml)
    /// 4. Built-in defaults (lowest priority)
    ///
    /// # Examples
    /// ```rust,no_run
    /// use histguard::config::Config;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::load()?;
    /// println!("Images up to {} bytes", config.images.max_image_bytes);
    /// # Ok(())
    /// # }
    /// ```
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Same as [`Config::load`], with an explicit file layered above the user config.
    pub fn load_with(config_file: Option<&Path>) -> Result<Self> {
        let mut loader =
            loader::ConfigLoader::new().with_defaults().with_system_config()?.with_user_config()?;
        if let Some(path) = config_file {
            loader = loader.with_config_file(path)?;
        }
        loader.with_env_vars()?.build()
    }

    /// Validate the current configuration
    pub fn validate(&self) -> Result<()> {
        validation::ConfigValidator::new(self).validate()
    }

    /// Expanded session directory, if one is configured.
    pub fn session_dir(&self) -> Result<Option<PathBuf>> {
        self.session.dir.as_deref().map(paths::expand_path).transpose()
    }

    /// Get configuration file example as TOML string
    pub fn example_toml() -> &'static str {
        r#"# histguard configuration
# This file should be placed at:
#   Linux/Unix: ~/.config/histguard/config.toml
#   macOS: ~/Library/Application Support/com.SkyCorp.histguard/config.toml
#   Windows: %APPDATA%/SkyCorp/histguard/config/config.toml

[logging]
# Logging level: trace, debug, info, warn, error (default: info)
log_level = "info"

[session]
# Directory holding one <safe-session-id>-<hash>.jsonl log per session (optional)
# Supports tilde (~) and $VAR expansion
# dir = "~/.local/share/histguard/sessions"

[sanitizer]
# Scope tag passed to the image sanitizer (default: "session:history")
scope_tag = "session:history"

# Log swallowed turn-ordering marker failures at debug level (default: true)
log_marker_failures = true

[images]
# Largest decoded inline image accepted, in bytes (default: 5242880)
max_image_bytes = 5242880

# Accepted image mime types
allowed_mime_types = ["image/png", "image/jpeg", "image/gif", "image/webp"]
"#
    }
}

impl LogLevel {
    /// Convert to tracing::Level for logging setup
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(SanitizeError::Config(format!(
                "Invalid log level '{}'. Valid levels are: trace, debug, info, warn, error",
                s
            ))),
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
