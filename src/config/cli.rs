//!
//! CLI configuration commands for histguard.
//!
//! - `config init` - write a commented example configuration
//! - `config show` - display the effective configuration
//! - `config validate` - validate the effective configuration
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use crate::config::loader::ConfigLoader;
use crate::config::paths;
use crate::config::validation::ConfigValidator;
use crate::config::Config;
use crate::error::{Result, SanitizeError};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/* --- types ----------------------------------------------------------------------------------- */

///
/// CLI configuration command handler.
pub struct ConfigCli;

/* --- implementations --------------------------------------------------------------------- */

impl ConfigCli {
    /// Handle the `config init` command
    ///
    /// Writes the example configuration to `target`, or to the user config file when
    /// no target is given. An existing file is only replaced with `force`.
    pub fn init(target: Option<&Path>, force: bool) -> Result<()> {
        let config_file = match target {
            Some(path) => path.to_path_buf(),
            None => paths::user_config_file()?,
        };

        if config_file.exists() && !force {
            println!("⚠️  Configuration file already exists at:");
            println!("   {}", config_file.display());
            println!("Use 'histguard config init --force' to overwrite it.");
            return Ok(());
        }

        Self::write_example(&config_file)?;

        println!("✅ Configuration saved to: {}", config_file.display());
        println!("Run 'histguard config validate' to verify your configuration.");
        Ok(())
    }

    /// Handle the `config show` command
    ///
    /// Displays the effective configuration after merging all sources.
    pub fn show(config_file: Option<&Path>) -> Result<()> {
        let config = Self::load_unvalidated(config_file)?;

        println!("📋 Current histguard Configuration");
        println!("==================================");
        println!();
        print!("{}", Self::render(&config)?);
        println!();

        println!("Session Logs:");
        match config.session_dir()? {
            Some(dir) => println!("  {}", dir.display()),
            None => {
                println!("  Not configured (in-memory unless --session-file is given)");
                if let Ok(suggested) = paths::default_session_dir() {
                    println!("  Suggested: dir = \"{}\"", suggested.display());
                }
            }
        }
        println!();

        println!("Configuration Sources:");
        let config_paths = paths::config_file_paths();
        for (i, path) in config_paths.iter().enumerate() {
            let priority = if i == 0 { "higher priority" } else { "lower priority" };
            let status = if path.exists() { "✅ exists" } else { "❌ not found" };
            println!("  {} ({}): {}", path.display(), priority, status);
        }
        if let Some(path) = config_file {
            println!("  {} (explicit, above user config)", path.display());
        }
        println!("  HISTGUARD_* environment variables (highest priority)");

        Ok(())
    }

    /// Handle the `config validate` command
    ///
    /// Prints every error and warning; fails when there is at least one error.
    pub fn validate(config_file: Option<&Path>) -> Result<()> {
        println!("🔍 Validating histguard Configuration");
        println!("=====================================");
        println!();

        print!("Loading configuration... ");
        io::stdout().flush()?;

        let config = match Self::load_unvalidated(config_file) {
            Ok(config) => {
                println!("✅ Loaded");
                config
            }
            Err(e) => {
                println!("❌ Failed");
                println!();
                println!("{}", e);
                return Err(e);
            }
        };

        let report = ConfigValidator::new(&config).report();
        for warning in &report.warnings {
            println!("⚠️  {}", warning);
        }
        for error in &report.errors {
            println!("❌ {}", error);
        }

        if report.errors.is_empty() {
            println!();
            println!("🎉 Configuration validation passed!");
            Ok(())
        } else {
            Err(SanitizeError::Config(format!(
                "Configuration validation failed with {} error(s)",
                report.errors.len()
            )))
        }
    }

    /// Effective configuration rendered as TOML
    pub fn render(config: &Config) -> Result<String> {
        toml::to_string_pretty(config)
            .map_err(|e| SanitizeError::Config(format!("Failed to serialize configuration: {}", e)))
    }

    /* --- private helper methods ---------------------------------------------------------- */

    fn load_unvalidated(config_file: Option<&Path>) -> Result<Config> {
        let mut loader =
            ConfigLoader::new().with_defaults().with_system_config()?.with_user_config()?;
        if let Some(path) = config_file {
            loader = loader.with_config_file(path)?;
        }
        loader.with_env_vars()?.build_unvalidated()
    }

    fn write_example(config_file: &Path) -> Result<()> {
        if let Some(config_dir) = config_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(config_dir).map_err(|e| {
                SanitizeError::Config(format!(
                    "Failed to create config directory '{}': {}",
                    config_dir.display(),
                    e
                ))
            })?;
        }

        fs::write(config_file, Config::example_toml()).map_err(|e| {
            SanitizeError::Config(format!(
                "Failed to write configuration file '{}': {}",
                config_file.display(),
                e
            ))
        })
    }
}

/* --- tests ------------------------------------------------------------------------------- */
