//!
//! Session log capability used for once-per-session bookkeeping.
//!
//! The sanitizer never owns session persistence; it receives a [`SessionLog`] with
//! every call and uses it to look up and append marker entries. Two backends ship
//! with the crate:
//! - `memory.rs` - ephemeral log for tests and one-shot runs
//! - `jsonl.rs` - append-only JSON-lines file per session
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod jsonl;
pub mod memory;

/* --- uses ------------------------------------------------------------------------------------ */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub use jsonl::JsonlSessionLog;
pub use memory::InMemorySessionLog;

/* --- constants ------------------------------------------------------------------------------ */

/// Entry type used for custom bookkeeping records
pub const CUSTOM_ENTRY_TYPE: &str = "custom";

/* --- types ----------------------------------------------------------------------------------- */

///
/// One persisted session-log record.
///
/// Only custom entries are produced by this crate; other entry kinds written by the
/// surrounding agent are read back untouched through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /** entry kind, `custom` for bookkeeping markers */
    #[serde(rename = "type")]
    pub entry_type: String,
    /** marker identifier for custom entries */
    #[serde(rename = "customType", default, skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    /** marker payload */
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    /** RFC 3339 creation time */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /** fields written by other producers */
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

///
/// Append-only session log.
///
/// `entries` may fail; callers treat a failed lookup as "no marker found".
/// `append_custom_entry_if_absent` is the primitive the sanitizer relies on: the
/// default body is a plain read-then-append, backends that can do better (both
/// shipped ones) override it with an atomic check under their own lock.
#[async_trait]
pub trait SessionLog: Send + Sync {
    /// All entries in append order.
    async fn entries(&self) -> Result<Vec<SessionEntry>>;

    /// Append a custom entry tagged with `custom_type`.
    async fn append_custom_entry(&self, custom_type: &str, data: Value) -> Result<()>;

    /// Whether a custom entry of this type exists. Lookup failures read as `false`.
    async fn has_custom_entry(&self, custom_type: &str) -> bool {
        match self.entries().await {
            Ok(entries) => entries.iter().any(|entry| entry.is_custom(custom_type)),
            Err(e) => {
                tracing::debug!(error = %e, custom_type, "Session log lookup failed");
                false
            }
        }
    }

    /// Append a custom entry unless one of the same type exists.
    ///
    /// Returns `Ok(true)` when this call inserted the entry.
    async fn append_custom_entry_if_absent(&self, custom_type: &str, data: Value) -> Result<bool> {
        if self.has_custom_entry(custom_type).await {
            return Ok(false);
        }
        self.append_custom_entry(custom_type, data).await?;
        Ok(true)
    }
}

/* --- implementations --------------------------------------------------------------------- */

impl SessionEntry {
    /// New custom entry stamped with the current time.
    pub fn custom(custom_type: &str, data: Value) -> Self {
        Self {
            entry_type: CUSTOM_ENTRY_TYPE.to_string(),
            custom_type: Some(custom_type.to_string()),
            data,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            extra: Map::new(),
        }
    }

    /// Whether this is a custom entry of the given type.
    pub fn is_custom(&self, custom_type: &str) -> bool {
        self.entry_type == CUSTOM_ENTRY_TYPE && self.custom_type.as_deref() == Some(custom_type)
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
