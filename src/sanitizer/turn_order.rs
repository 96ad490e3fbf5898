//!
//! Turn-ordering fix for backends that require a user turn first.
//!
//! Google-family backends reject a history that opens with an assistant turn. A
//! small synthetic user bootstrap is prepended in that case, and a marker entry in
//! the session log ensures the accompanying warning is emitted once per session.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::borrow::Cow;

use serde_json::{Value, json};

use super::WarnSink;
use crate::backend::is_google_model_api;
use crate::message::{Message, MessageContent, Role};
use crate::session::SessionLog;

/* --- constants ------------------------------------------------------------------------------ */

/// Custom entry type recording that the bootstrap fix was applied and warned about
pub const GOOGLE_TURN_ORDERING_CUSTOM_TYPE: &str = "google-turn-ordering-bootstrap";

/// Content of the synthetic user turn
pub const GOOGLE_TURN_ORDER_BOOTSTRAP_TEXT: &str = "(session bootstrap)";

/* --- types ----------------------------------------------------------------------------------- */

///
/// Inputs of [`apply_google_turn_ordering_fix`].
pub struct TurnOrderingRequest<'a> {
    /** history to fix; never modified */
    pub messages: &'a [Message],
    /** target model API identifier */
    pub model_api: Option<&'a str>,
    /** log consulted for the once-per-session marker */
    pub session_log: &'a dyn SessionLog,
    /** session identifier, included in the warning */
    pub session_id: &'a str,
    /** warning sink; `tracing::warn!` when `None` */
    pub warn: Option<&'a WarnSink>,
    /** log suppressed marker bookkeeping failures at debug level */
    pub log_marker_failures: bool,
}

///
/// Result of the turn-ordering fix.
#[derive(Debug)]
pub struct TurnOrderingFix<'a> {
    /** fixed history, borrowed when unchanged */
    pub messages: Cow<'a, [Message]>,
    /** whether a bootstrap user turn was prepended */
    pub did_prepend: bool,
}

/* --- start of code -------------------------------------------------------------------------- */

///
/// Make the history start with a user turn.
///
/// A bootstrap user message is prepended only when the first message is an
/// assistant turn; any other history (including one already bootstrapped) is
/// returned borrowed.
pub fn sanitize_google_turn_ordering(messages: &[Message]) -> Cow<'_, [Message]> {
    match messages.first() {
        Some(first) if first.role == Role::Assistant => {
            let mut bootstrap =
                Message::new(Role::User, MessageContent::Text(GOOGLE_TURN_ORDER_BOOTSTRAP_TEXT.to_string()));
            bootstrap
                .extra
                .insert("timestamp".to_string(), json!(chrono::Utc::now().timestamp_millis()));

            let mut out = Vec::with_capacity(messages.len() + 1);
            out.push(bootstrap);
            out.extend_from_slice(messages);
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(messages),
    }
}

///
/// Apply the turn-ordering fix for Google-family backends.
///
/// Bookkeeping failures never fail the fix: if the marker cannot be read or written
/// the warning is still emitted, on a best-effort basis.
///
/// # Arguments
///  * `request` - messages, backend, session log and warning sink
///
/// # Returns
///  * [`TurnOrderingFix`] with the (possibly) fixed history and whether it was prepended
pub async fn apply_google_turn_ordering_fix<'a>(
    request: TurnOrderingRequest<'a>,
) -> TurnOrderingFix<'a> {
    if !is_google_model_api(request.model_api) {
        return unchanged(request.messages);
    }
    match request.messages.first() {
        Some(first) if first.role == Role::Assistant => {}
        _ => return unchanged(request.messages),
    }

    let messages = sanitize_google_turn_ordering(request.messages);
    let did_prepend = matches!(messages, Cow::Owned(_));

    if did_prepend && claim_marker(&request).await {
        let text = format!(
            "google turn ordering fixup: prepended user bootstrap (sessionId={})",
            request.session_id
        );
        match request.warn {
            Some(warn) => warn(&text),
            None => tracing::warn!("{}", text),
        }
    }

    TurnOrderingFix { messages, did_prepend }
}

fn unchanged(messages: &[Message]) -> TurnOrderingFix<'_> {
    TurnOrderingFix { messages: Cow::Borrowed(messages), did_prepend: false }
}

/// Claim the session marker. `true` means this call should emit the warning.
async fn claim_marker(request: &TurnOrderingRequest<'_>) -> bool {
    let payload: Value = json!({ "timestamp": chrono::Utc::now().timestamp_millis() });
    match request
        .session_log
        .append_custom_entry_if_absent(GOOGLE_TURN_ORDERING_CUSTOM_TYPE, payload)
        .await
    {
        Ok(inserted) => inserted,
        Err(e) => {
            if request.log_marker_failures {
                tracing::debug!(
                    error = %e,
                    session_id = request.session_id,
                    "Ignoring turn-ordering marker failure"
                );
            }
            true
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
