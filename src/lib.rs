//! # histguard - Message History Sanitization for LLM Backends
//!
//! Agents keep one backend-agnostic conversation history, but backends disagree on
//! what a valid history looks like. Gemini rejects reasoning and function calls
//! replayed without their signatures and wants the conversation to open with a user
//! turn; the Anthropic messages API wants tool calls to close an assistant turn;
//! every backend wants tool calls and results paired exactly. This crate rewrites a
//! history so it satisfies the target backend, without dropping information the
//! model needs to continue the conversation.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use histguard::{HistorySanitizer, InMemorySessionLog, Message, SessionHistoryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let messages: Vec<Message> = serde_json::from_str(r#"[
//!         { "role": "assistant", "content": [{ "type": "thinking", "thinking": "plan" }] }
//!     ]"#)?;
//!     let log = InMemorySessionLog::new();
//!
//!     let sanitized = HistorySanitizer::default()
//!         .sanitize_session_history(SessionHistoryRequest {
//!             messages: &messages,
//!             model_api: Some("google-gemini-cli"),
//!             session_log: &log,
//!             session_id: "session-1",
//!         })
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&sanitized)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`message`] - Message and content-block model
//! - [`backend`] - Backend-family classification
//! - [`sanitizer`] - The pipeline and its stages
//! - [`session`] - Session logs holding per-session markers
//! - [`schema`] - Tool schema audit for Google backends
//! - [`config`] - Layered configuration
//! - [`error`] - Error types and handling

pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod sanitizer;
pub mod schema;
pub mod session;

// Re-export commonly used types
pub use backend::{ImageSanitizeOptions, is_google_model_api};
pub use config::Config;
pub use error::{Result, SanitizeError};
pub use message::{ContentBlock, Message, MessageContent, Role, ToolCallTag};
pub use sanitizer::{
    HistorySanitizer, SessionHistoryRequest, WarnSink, apply_google_turn_ordering_fix,
    downgrade_thinking_blocks, downgrade_tool_call_history, sanitize_google_turn_ordering,
    sanitize_session_history,
};
pub use schema::{ToolDefinition, find_unsupported_schema_keywords, log_tool_schemas_for_google};
pub use session::{InMemorySessionLog, JsonlSessionLog, SessionEntry, SessionLog};
