//!
//! In-memory session log, useful for tests and one-shot sanitization runs.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{SessionEntry, SessionLog};
use crate::error::Result;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Session log that keeps entries in a shared `Vec`.
///
/// Clones share the same entries, so a clone handed to another task sees and
/// claims the same markers.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionLog {
    entries: Arc<Mutex<Vec<SessionEntry>>>,
}

/* --- implementations --------------------------------------------------------------------- */

impl InMemorySessionLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from pre-existing entries.
    pub fn with_entries(entries: Vec<SessionEntry>) -> Self {
        Self { entries: Arc::new(Mutex::new(entries)) }
    }

    /// Number of entries currently stored.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionLog for InMemorySessionLog {
    async fn entries(&self) -> Result<Vec<SessionEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn append_custom_entry(&self, custom_type: &str, data: Value) -> Result<()> {
        self.entries.lock().await.push(SessionEntry::custom(custom_type, data));
        Ok(())
    }

    /// Check and push under one lock guard.
    async fn append_custom_entry_if_absent(&self, custom_type: &str, data: Value) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|entry| entry.is_custom(custom_type)) {
            return Ok(false);
        }
        entries.push(SessionEntry::custom(custom_type, data));
        Ok(true)
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
