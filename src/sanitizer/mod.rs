//!
//! Session history sanitization pipeline.
//!
//! A raw history is passed through a fixed sequence of stages before it is sent to
//! a model backend:
//!
//! 1. image sanitization (collaborator, async)
//! 2. tool invocation / result pairing repair (collaborator)
//! 3. thinking-block signature downgrade (Google family only)
//! 4. tool-call signature downgrade (Google family only)
//! 5. turn-ordering fix (Google family only)
//!
//! Stages 3 to 5 are pure functions over `&[Message]` returning `Cow`, so a stage
//! that finds nothing to change costs no allocation.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod images;
pub mod pairing;
pub mod thinking;
pub mod tool_calls;
pub mod turn_order;

/* --- uses ------------------------------------------------------------------------------------ */

use std::borrow::Cow;
use std::sync::Arc;

use crate::backend::{ImageSanitizeOptions, is_google_model_api};
use crate::config::Config;
use crate::error::Result;
use crate::message::Message;
use crate::session::SessionLog;

pub use images::{DefaultImageSanitizer, ImageSanitizer};
pub use pairing::{DefaultPairingRepairer, PairingRepairer, RepairStats};
pub use thinking::downgrade_thinking_blocks;
pub use tool_calls::downgrade_tool_call_history;
pub use turn_order::{
    TurnOrderingFix, TurnOrderingRequest, apply_google_turn_ordering_fix,
    sanitize_google_turn_ordering,
};

/* --- constants ------------------------------------------------------------------------------ */

/// Scope tag passed to the image sanitizer for session history
pub const SESSION_HISTORY_SCOPE: &str = "session:history";

/* --- types ----------------------------------------------------------------------------------- */

/// Sink for user-facing warnings
pub type WarnSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-message decision of a rewriting stage.
pub(crate) enum Rewrite {
    Keep,
    Replace(Message),
    Drop,
}

///
/// Inputs of one sanitization run.
pub struct SessionHistoryRequest<'a> {
    /** raw history; never modified */
    pub messages: &'a [Message],
    /** target model API identifier */
    pub model_api: Option<&'a str>,
    /** log holding the once-per-session turn-ordering marker */
    pub session_log: &'a dyn SessionLog,
    /** session identifier, used in warnings */
    pub session_id: &'a str,
}

///
/// The sanitization pipeline with its collaborators.
///
/// Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct HistorySanitizer {
    image_sanitizer: Arc<dyn ImageSanitizer>,
    pairing_repairer: Arc<dyn PairingRepairer>,
    warn: Option<WarnSink>,
    scope_tag: String,
    log_marker_failures: bool,
}

/* --- helpers --------------------------------------------------------------------------------- */

/// Apply `f` to every message, copying the history only once something changes.
pub(crate) fn rewrite_messages<'a>(
    messages: &'a [Message],
    mut f: impl FnMut(&Message) -> Rewrite,
) -> Cow<'a, [Message]> {
    let mut out: Option<Vec<Message>> = None;
    for (idx, msg) in messages.iter().enumerate() {
        match f(msg) {
            Rewrite::Keep => {
                if let Some(out) = out.as_mut() {
                    out.push(msg.clone());
                }
            }
            Rewrite::Replace(next) => out.get_or_insert_with(|| messages[..idx].to_vec()).push(next),
            Rewrite::Drop => {
                out.get_or_insert_with(|| messages[..idx].to_vec());
            }
        }
    }
    match out {
        Some(out) => Cow::Owned(out),
        None => Cow::Borrowed(messages),
    }
}

/* --- implementations --------------------------------------------------------------------- */

impl Default for HistorySanitizer {
    fn default() -> Self {
        Self::new(Arc::new(DefaultImageSanitizer::default()), Arc::new(DefaultPairingRepairer))
    }
}

impl std::fmt::Debug for HistorySanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistorySanitizer")
            .field("scope_tag", &self.scope_tag)
            .field("log_marker_failures", &self.log_marker_failures)
            .field("custom_warn_sink", &self.warn.is_some())
            .finish_non_exhaustive()
    }
}

impl HistorySanitizer {
    /// Pipeline with the given collaborators and default settings.
    pub fn new(
        image_sanitizer: Arc<dyn ImageSanitizer>,
        pairing_repairer: Arc<dyn PairingRepairer>,
    ) -> Self {
        Self {
            image_sanitizer,
            pairing_repairer,
            warn: None,
            scope_tag: SESSION_HISTORY_SCOPE.to_string(),
            log_marker_failures: true,
        }
    }

    /// Pipeline with the default collaborators configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut sanitizer = Self::new(
            Arc::new(DefaultImageSanitizer::new(&config.images)),
            Arc::new(DefaultPairingRepairer),
        );
        sanitizer.scope_tag = config.sanitizer.scope_tag.clone();
        sanitizer.log_marker_failures = config.sanitizer.log_marker_failures;
        sanitizer
    }

    /// Route user-facing warnings to `warn` instead of `tracing::warn!`.
    pub fn with_warn_sink(mut self, warn: WarnSink) -> Self {
        self.warn = Some(warn);
        self
    }

    ///
    /// Sanitize a session history for the target backend.
    ///
    /// Collaborator failures propagate unchanged. Marker bookkeeping failures in the
    /// turn-ordering stage never do.
    ///
    /// # Returns
    ///  * the sanitized history; the input slice is left untouched
    pub async fn sanitize_session_history(&self, request: SessionHistoryRequest<'_>) -> Result<Vec<Message>> {
        let api = request.model_api;
        let is_google = is_google_model_api(api);

        let images = self
            .image_sanitizer
            .sanitize(request.messages, &self.scope_tag, ImageSanitizeOptions::for_model_api(api))
            .await?;
        let repaired = self.pairing_repairer.repair(&images)?;

        if !is_google {
            tracing::debug!(model_api = ?api, messages = repaired.len(), "Sanitized session history");
            return Ok(repaired);
        }

        let thinking = downgrade_thinking_blocks(&repaired);
        let tool_calls = downgrade_tool_call_history(&thinking);
        let fix = apply_google_turn_ordering_fix(TurnOrderingRequest {
            messages: &tool_calls,
            model_api: api,
            session_log: request.session_log,
            session_id: request.session_id,
            warn: self.warn.as_ref(),
            log_marker_failures: self.log_marker_failures,
        })
        .await;

        let out = fix.messages.into_owned();
        tracing::debug!(
            model_api = ?api,
            session_id = request.session_id,
            messages = out.len(),
            bootstrapped = fix.did_prepend,
            "Sanitized session history"
        );
        Ok(out)
    }
}

///
/// Sanitize a session history with the default collaborators.
pub async fn sanitize_session_history(request: SessionHistoryRequest<'_>) -> Result<Vec<Message>> {
    HistorySanitizer::default().sanitize_session_history(request).await
}

/* --- tests ----------------------------------------------------------------------------------- */
