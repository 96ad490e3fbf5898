//!
//! Configuration validation for histguard.
//!
//! Collects every problem before reporting, so a single `config validate` run shows
//! all of them. Errors fail validation; warnings are logged and reported only.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use crate::config::paths;
use crate::config::{Config, LogLevel};
use crate::error::{Result, SanitizeError};

/* --- constants ------------------------------------------------------------------------------- */

/// Image limit above which a warning is issued (20MB)
const LARGE_IMAGE_LIMIT: usize = 20 * 1024 * 1024;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Configuration validator.
pub struct ConfigValidator<'a> {
    /// Configuration to validate
    config: &'a Config,
    /// Validation errors collected during validation
    errors: Vec<String>,
    /// Validation warnings collected during validation
    warnings: Vec<String>,
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/* --- implementations --------------------------------------------------------------------- */

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, errors: Vec::new(), warnings: Vec::new() }
    }

    /// Run every check and return the collected errors and warnings
    pub fn report(mut self) -> ValidationReport {
        self.validate_logging_config();
        self.validate_session_config();
        self.validate_sanitizer_config();
        self.validate_image_config();

        ValidationReport { errors: self.errors, warnings: self.warnings }
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid (warnings are logged)
    /// * `Err(SanitizeError::Config)` - one or more errors, numbered in the message
    pub fn validate(self) -> Result<()> {
        let report = self.report();

        for warning in &report.warnings {
            tracing::warn!("Configuration warning: {}", warning);
        }

        if !report.errors.is_empty() {
            let error_msg = format!(
                "Configuration validation failed with {} error(s):\n\n{}\n\
                 \n\
                 Please fix these issues and try again.",
                report.errors.len(),
                report
                    .errors
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("{}. {}", i + 1, e))
                    .collect::<Vec<_>>()
                    .join("\n")
            );
            return Err(SanitizeError::Config(error_msg));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /* --- private validation methods ------------------------------------------------------ */

    fn validate_logging_config(&mut self) {
        if self.config.logging.log_level == LogLevel::Trace {
            self.add_warning(
                "Trace log level enabled: message contents may end up in logs".to_string(),
            );
        }
    }

    /// Validate the session directory, if one is configured
    fn validate_session_config(&mut self) {
        let Some(dir) = self.config.session.dir.as_deref() else {
            return;
        };

        if dir.trim().is_empty() {
            self.add_error("session.dir is set but empty".to_string());
            return;
        }

        match paths::expand_path(dir) {
            Ok(path) if path.exists() && !path.is_dir() => {
                self.add_error(format!(
                    "session.dir '{}' exists but is not a directory",
                    path.display()
                ));
            }
            Ok(path) if !path.exists() => {
                self.add_warning(format!(
                    "session.dir '{}' does not exist yet; it will be created on first write",
                    path.display()
                ));
            }
            Ok(_) => {}
            Err(e) => {
                self.add_error(format!("Failed to expand session.dir '{}': {}", dir, e));
            }
        }
    }

    fn validate_sanitizer_config(&mut self) {
        if self.config.sanitizer.scope_tag.trim().is_empty() {
            self.add_error("sanitizer.scope_tag cannot be empty".to_string());
        }
    }

    fn validate_image_config(&mut self) {
        let images = &self.config.images;

        if images.max_image_bytes == 0 {
            self.add_error("images.max_image_bytes cannot be zero".to_string());
        } else if images.max_image_bytes > LARGE_IMAGE_LIMIT {
            self.add_warning(format!(
                "Large image limit ({} bytes): most backends reject payloads this big",
                images.max_image_bytes
            ));
        }

        if images.allowed_mime_types.is_empty() {
            self.add_warning(
                "images.allowed_mime_types is empty: every inline image will be omitted".to_string(),
            );
        }

        let odd: Vec<String> = images
            .allowed_mime_types
            .iter()
            .filter(|mime| !mime.to_lowercase().starts_with("image/"))
            .cloned()
            .collect();
        for mime in odd {
            self.add_warning(format!("'{}' in images.allowed_mime_types is not an image type", mime));
        }
    }

    /// Add a validation error
    fn add_error(&mut self, error: String) {
        tracing::debug!("Validation error: {}", error);
        self.errors.push(error);
    }

    /// Add a validation warning
    fn add_warning(&mut self, warning: String) {
        tracing::debug!("Validation warning: {}", warning);
        self.warnings.push(warning);
    }
}

/* --- tests ------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(ConfigValidator::new(&config).report(), ValidationReport::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_image_limit_fails_validation() {
        let mut config = Config::default();
        config.images.max_image_bytes = 0;

        let result = ConfigValidator::new(&config).validate();
        let error_msg = format!("{}", result.unwrap_err());
        assert!(error_msg.contains("max_image_bytes cannot be zero"));
    }

    #[test]
    fn test_empty_scope_tag_fails_validation() {
        let mut config = Config::default();
        config.sanitizer.scope_tag = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_dir_that_is_a_file_fails_validation() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let mut config = Config::default();
        config.session.dir = Some(file.to_string_lossy().to_string());

        let report = ConfigValidator::new(&config).report();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("not a directory"));
    }

    #[test]
    fn test_missing_session_dir_is_a_warning() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.session.dir = Some(temp_dir.path().join("later").to_string_lossy().to_string());

        let report = ConfigValidator::new(&config).report();
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_mime_type_warnings() {
        let mut config = Config::default();
        config.images.allowed_mime_types = vec!["image/png".to_string(), "text/plain".to_string()];
        config.logging.log_level = LogLevel::Trace;

        let report = ConfigValidator::new(&config).report();
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(config.validate().is_ok());
    }
}
