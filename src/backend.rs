//!
//! Backend-family classification for model API identifiers.
//!
//! Backends sharing the same structural constraints form a family. The Google
//! family rejects unsigned reasoning and function-call replays and requires the
//! conversation to open with a user turn; the Anthropic messages API wants tool
//! invocations to close an assistant turn.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- constants ------------------------------------------------------------------------------ */

/// Model API identifiers that belong to the Google family
pub const GOOGLE_MODEL_APIS: [&str; 3] =
    ["google-gemini-cli", "google-generative-ai", "google-antigravity"];

/// Anthropic-compatible API that requires tool calls to be the final assistant block
pub const ANTHROPIC_MESSAGES_API: &str = "anthropic-messages";

/* --- types ----------------------------------------------------------------------------------- */

///
/// Options handed to the image sanitizer, derived from the target backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSanitizeOptions {
    /** rewrite tool-call ids into the Cloud Code Assist id grammar */
    pub sanitize_tool_call_ids: bool,
    /** drop assistant blocks that follow the last tool invocation */
    pub enforce_tool_call_last: bool,
}

/* --- start of code -------------------------------------------------------------------------- */

/// Whether the model API identifier belongs to the Google family.
pub fn is_google_model_api(api: Option<&str>) -> bool {
    api.is_some_and(|api| GOOGLE_MODEL_APIS.contains(&api))
}

impl ImageSanitizeOptions {
    /// Options for a given target model API.
    pub fn for_model_api(api: Option<&str>) -> Self {
        Self {
            sanitize_tool_call_ids: is_google_model_api(api),
            enforce_tool_call_last: api == Some(ANTHROPIC_MESSAGES_API),
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */
