//! Configuration tests
//!
//! Tests for layered configuration loading: defaults, TOML files and `HISTGUARD_*`
//! environment overrides, plus validation of the merged result.
//!
//! Uses temp-env to safely manage environment variables during tests, automatically
//! restoring them after each test completes.

use std::fs;

use histguard::HistorySanitizer;
use histguard::config::loader::ConfigLoader;
use histguard::config::validation::ConfigValidator;
use histguard::config::{Config, LogLevel};
use tempfile::TempDir;
use temp_env::with_vars;

const ALL_ENV_VARS: [&str; 6] = [
    "HISTGUARD_LOG_LEVEL",
    "HISTGUARD_SESSION_DIR",
    "HISTGUARD_SCOPE_TAG",
    "HISTGUARD_LOG_MARKER_FAILURES",
    "HISTGUARD_MAX_IMAGE_BYTES",
    "HISTGUARD_ALLOWED_MIME_TYPES",
];

/// Run `f` with every histguard variable unset except the given ones.
fn with_histguard_env<F: FnOnce()>(set: &[(&str, &str)], f: F) {
    let vars: Vec<(&str, Option<&str>)> = ALL_ENV_VARS
        .iter()
        .map(|name| (*name, set.iter().find(|(k, _)| k == name).map(|(_, v)| *v)))
        .collect();
    with_vars(vars, f);
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

/// Test that defaults are used when no file or variable is present
#[test]
fn test_defaults_without_sources() {
    with_histguard_env(&[], || {
        let config = ConfigLoader::new().with_defaults().with_env_vars().unwrap().build().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sanitizer.scope_tag, "session:history");
        assert!(config.sanitizer.log_marker_failures);
        assert_eq!(config.images.max_image_bytes, 5 * 1024 * 1024);
    });
}

/// Test that a partial file only replaces the keys it names
#[test]
fn test_partial_file_merges_over_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "[images]\nmax_image_bytes = 1024\n");

    with_histguard_env(&[], || {
        let config = ConfigLoader::new()
            .with_defaults()
            .with_config_file(&path)
            .unwrap()
            .with_env_vars()
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.images.max_image_bytes, 1024);
        assert_eq!(config.images.allowed_mime_types, Config::default().images.allowed_mime_types);
        assert_eq!(config.logging.log_level, LogLevel::Info);
    });
}

/// Test that environment variables win over file values
#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "[sanitizer]\nscope_tag = \"from:file\"\nlog_marker_failures = true\n");

    with_histguard_env(
        &[
            ("HISTGUARD_SCOPE_TAG", "from:env"),
            ("HISTGUARD_LOG_MARKER_FAILURES", "false"),
            ("HISTGUARD_LOG_LEVEL", "debug"),
            ("HISTGUARD_ALLOWED_MIME_TYPES", "image/png, image/jpeg"),
        ],
        || {
            let config = ConfigLoader::new()
                .with_defaults()
                .with_config_file(&path)
                .unwrap()
                .with_env_vars()
                .unwrap()
                .build()
                .unwrap();

            assert_eq!(config.sanitizer.scope_tag, "from:env");
            assert!(!config.sanitizer.log_marker_failures);
            assert_eq!(config.logging.log_level, LogLevel::Debug);
            assert_eq!(config.images.allowed_mime_types, vec!["image/png", "image/jpeg"]);
        },
    );
}

/// Test that malformed environment values are rejected
#[test]
fn test_invalid_env_values() {
    with_histguard_env(&[("HISTGUARD_MAX_IMAGE_BYTES", "lots")], || {
        assert!(ConfigLoader::new().with_defaults().with_env_vars().unwrap().build().is_err());
    });
    with_histguard_env(&[("HISTGUARD_LOG_LEVEL", "verbose")], || {
        assert!(ConfigLoader::new().with_defaults().with_env_vars().unwrap().build().is_err());
    });
}

/// Test that invalid TOML files are reported with their path
#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "[images\nmax_image_bytes = ");

    let err = ConfigLoader::new().with_defaults().with_config_file(&path).unwrap_err();
    assert!(format!("{}", err).contains("config.toml"));
}

/// Test that a zero image limit fails validation
#[test]
fn test_validation_rejects_zero_image_limit() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "[images]\nmax_image_bytes = 0\n");

    with_histguard_env(&[], || {
        let loader = || {
            ConfigLoader::new().with_defaults().with_config_file(&path).unwrap().with_env_vars().unwrap()
        };
        assert!(loader().build().is_err());

        let config = loader().build_unvalidated().unwrap();
        let report = ConfigValidator::new(&config).report();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("max_image_bytes"));
    });
}

/// Test that the session directory is expanded and used for session logs
#[test]
fn test_session_dir_from_env() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_string_lossy().to_string();

    with_histguard_env(&[("HISTGUARD_SESSION_DIR", dir.as_str())], || {
        let config = ConfigLoader::new().with_defaults().with_env_vars().unwrap().build().unwrap();
        assert_eq!(config.session_dir().unwrap(), Some(temp_dir.path().to_path_buf()));
    });
}

/// Test that the example file loads as the defaults
#[test]
fn test_example_file_matches_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, Config::example_toml());

    with_histguard_env(&[], || {
        let config = ConfigLoader::new()
            .with_defaults()
            .with_config_file(&path)
            .unwrap()
            .with_env_vars()
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config, Config::default());
    });
}

/// Test that a pipeline can be built from a loaded configuration
#[test]
fn test_sanitizer_from_loaded_config() {
    with_histguard_env(&[("HISTGUARD_SCOPE_TAG", "custom:scope")], || {
        let config = ConfigLoader::new().with_defaults().with_env_vars().unwrap().build().unwrap();
        let rendered = format!("{:?}", HistorySanitizer::from_config(&config));
        assert!(rendered.contains("custom:scope"));
    });
}
