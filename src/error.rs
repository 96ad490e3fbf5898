//!
//! Error handling for the histguard sanitization pipeline.
//!
//! Defines all error types used throughout the crate using thiserror.
//! Structural problems in a history are repaired, never reported here; these
//! variants cover configuration, collaborator and bookkeeping failures.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use thiserror::Error;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application error types.
///
/// Collaborator failures (image sanitizer, pairing repairer) propagate to the caller
/// unchanged; session-log failures are swallowed by the turn-ordering fixer.
#[derive(Error, Debug)]
pub enum SanitizeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session log error: {0}")]
    Session(String),

    #[error("Image sanitizer error: {0}")]
    ImageSanitizer(String),

    #[error("Pairing repair error: {0}")]
    PairingRepair(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/* --- start of code -------------------------------------------------------------------------- */

/// Result type alias for cleaner error handling throughout the crate
pub type Result<T> = std::result::Result<T, SanitizeError>;
