//!
//! Where histguard looks for its files.
//!
//! Config and data locations come from `directories`, so each platform gets its
//! native layout (XDG on Linux, Application Support on macOS, Known Folders on
//! Windows). Nothing here creates directories; writers create what they need.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};

use crate::error::{Result, SanitizeError};

/* --- constants ------------------------------------------------------------------------------- */

const APP_NAME: &str = "histguard";
const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "SkyCorp";

/// File name of every configuration layer
const CONFIG_FILE_NAME: &str = "config.toml";

/* --- public functions ------------------------------------------------------------------------ */

/// User configuration file, e.g. `~/.config/histguard/config.toml` on Linux.
pub fn user_config_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

/// Machine-wide configuration file, read below the user file.
pub fn system_config_file() -> Result<PathBuf> {
    system_config_root()
        .map(|root| root.join(APP_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| SanitizeError::Config("No system configuration directory on this platform".to_string()))
}

/// Suggested home for per-session JSONL logs (`~/.local/share/histguard/sessions` on Linux).
pub fn default_session_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("sessions"))
}

/// Configuration files that exist on this platform, highest priority first.
pub fn config_file_paths() -> Vec<PathBuf> {
    [user_config_file(), system_config_file()].into_iter().filter_map(Result::ok).collect()
}

///
/// Expand a leading `~` and `$VAR` / `${VAR}` references.
///
/// Referencing an unset variable is an error.
///
/// # Examples
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let expanded = histguard::config::paths::expand_path("~/.config/histguard/config.toml")?;
/// assert!(!expanded.to_string_lossy().starts_with('~'));
/// # Ok(())
/// # }
/// ```
pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let raw = path.as_ref().to_string_lossy();
    if !raw.starts_with('~') && !raw.contains('$') {
        return Ok(path.as_ref().to_path_buf());
    }

    let home = || UserDirs::new().map(|dirs| dirs.home_dir().to_string_lossy().into_owned());
    let expanded = shellexpand::full_with_context(&raw, home, |var: &str| std::env::var(var).map(Some))
        .map_err(|e| SanitizeError::Config(format!("Failed to expand path '{}': {}", raw, e)))?;

    Ok(PathBuf::from(expanded.as_ref()))
}

/// Fail unless `path` is a readable regular file.
pub fn validate_config_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| {
        SanitizeError::Config(format!("Configuration file '{}' is not accessible: {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(SanitizeError::Config(format!(
            "Configuration path '{}' is not a regular file",
            path.display()
        )));
    }

    std::fs::File::open(path).map(|_| ()).map_err(|e| {
        SanitizeError::Config(format!(
            "Configuration file '{}' cannot be read: {}\n\
             You can fix this with: chmod 644 '{}'",
            path.display(),
            e,
            path.display()
        ))
    })
}

/* --- private functions ----------------------------------------------------------------------- */

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APP_NAME).ok_or_else(|| {
        SanitizeError::Config("Unable to determine the home directory for histguard files".to_string())
    })
}

#[cfg(all(unix, not(target_os = "macos")))]
fn system_config_root() -> Option<PathBuf> {
    Some(PathBuf::from("/etc"))
}

#[cfg(target_os = "macos")]
fn system_config_root() -> Option<PathBuf> {
    Some(PathBuf::from("/Library/Preferences"))
}

#[cfg(windows)]
fn system_config_root() -> Option<PathBuf> {
    std::env::var_os("PROGRAMDATA").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn system_config_root() -> Option<PathBuf> {
    None
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand_path("~/test/path").unwrap();
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.ends_with("test/path"));

        assert_eq!(expand_path("/absolute/path").unwrap(), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("HISTGUARD_TEST_ROOT", Some("/srv/hg"), || {
            assert_eq!(expand_path("$HISTGUARD_TEST_ROOT/sessions").unwrap(), PathBuf::from("/srv/hg/sessions"));
            assert_eq!(expand_path("${HISTGUARD_TEST_ROOT}/x").unwrap(), PathBuf::from("/srv/hg/x"));
        });
        temp_env::with_var_unset("HISTGUARD_TEST_UNSET", || {
            assert!(expand_path("$HISTGUARD_TEST_UNSET/sessions").is_err());
        });
    }

    #[test]
    fn test_validate_config_file() {
        assert!(validate_config_file("/non/existent/file.toml").is_err());

        let temp_dir = TempDir::new().unwrap();
        assert!(validate_config_file(temp_dir.path()).is_err());

        let temp_file = temp_dir.path().join("test.toml");
        fs::write(&temp_file, "test content").unwrap();
        assert!(validate_config_file(&temp_file).is_ok());
    }

    #[test]
    fn test_file_locations() {
        assert!(user_config_file().unwrap().ends_with("config.toml"));
        assert!(default_session_dir().unwrap().ends_with("sessions"));
        #[cfg(unix)]
        assert!(system_config_file().unwrap().ends_with("histguard/config.toml"));
    }
}
