//!
//! File-based session log: append-only JSON lines, one [`SessionEntry`] per line.
//!
//! Entries are re-read from disk on every lookup so records appended by other
//! writers are seen. Appends and the check-then-append claim are serialized through
//! an in-process lock; separate processes sharing one file are not coordinated.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{SessionEntry, SessionLog};
use crate::error::{Result, SanitizeError};

/* --- constants ------------------------------------------------------------------------------- */

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Session log persisted as a JSONL file.
///
/// One instance per file; share it by reference between concurrent sanitization
/// passes so the marker claim stays atomic.
#[derive(Debug)]
pub struct JsonlSessionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/* --- implementations --------------------------------------------------------------------- */

impl JsonlSessionLog {
    /// Use the given file. It is created on first append.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "JSONL session log opened");
        Self { path, write_lock: Mutex::new(()) }
    }

    ///
    /// Log file for `session_id` inside `dir`.
    ///
    /// The file name is the id made filesystem-safe plus a hash of the raw id, so
    /// ids differing only in replaced characters get separate files.
    ///
    /// # Arguments
    ///  * `dir` - directory holding session logs; created on first append
    ///  * `session_id` - raw session identifier
    pub fn for_session(dir: impl AsRef<Path>, session_id: &str) -> Self {
        Self::open(dir.as_ref().join(format!("{}.jsonl", session_file_stem(session_id))))
    }

    /// File backing this log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<SessionEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SanitizeError::Session(format!(
                    "Failed to read session log '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<SessionEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, path = %self.path.display(), "Skipping corrupted session entry");
                    None
                }
            })
            .collect())
    }

    async fn write_entry(&self, entry: &SessionEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                SanitizeError::Session(format!(
                    "Failed to open session log '{}' for append: {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionLog for JsonlSessionLog {
    /// Every parseable entry in file order; corrupted lines are skipped with a warning.
    async fn entries(&self) -> Result<Vec<SessionEntry>> {
        self.read_entries().await
    }

    async fn append_custom_entry(&self, custom_type: &str, data: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_entry(&SessionEntry::custom(custom_type, data)).await
    }

    ///
    /// Check and append under one lock, so concurrent claims on this instance insert once.
    ///
    /// An unreadable file counts as "absent": the caller still gets its claim.
    async fn append_custom_entry_if_absent(&self, custom_type: &str, data: Value) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let present = match self.read_entries().await {
            Ok(entries) => entries.iter().any(|entry| entry.is_custom(custom_type)),
            Err(e) => {
                debug!(error = %e, "Session log lookup failed, treating marker as absent");
                false
            }
        };
        if present {
            return Ok(false);
        }
        self.write_entry(&SessionEntry::custom(custom_type, data)).await?;
        Ok(true)
    }
}

/* --- helpers --------------------------------------------------------------------------------- */

/// `<safe id>-<hash>`: anything outside `[A-Za-z0-9_-]` becomes `_`, the hash keeps ids apart.
fn session_file_stem(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let safe = if safe.is_empty() { "session" } else { safe.as_str() };
    format!("{}-{:016x}", safe, fnv1a_64(session_id.as_bytes()))
}

/// FNV-1a, stable across builds and platforms.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

/* --- tests ----------------------------------------------------------------------------------- */
