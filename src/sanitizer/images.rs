//!
//! Image content sanitizer and tool-call id normalization.
//!
//! The default [`ImageSanitizer`] validates every inline image payload (base64,
//! size, mime type) and replaces the ones a backend would reject with a short text
//! note. Depending on the backend it also rewrites tool-call ids into the Cloud Code
//! Assist grammar and trims assistant content that follows the last tool call.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::backend::ImageSanitizeOptions;
use crate::config::ImageConfig;
use crate::error::Result;
use crate::message::{ContentBlock, ImageBlock, Message, MessageContent, Role};

/* --- constants ------------------------------------------------------------------------------ */

/// Longest tool-call id accepted by Cloud Code Assist
pub const MAX_TOOL_CALL_ID_LEN: usize = 64;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Image sanitizer collaborator.
///
/// Implementations may suspend (re-encoding, fetching); failures propagate out of
/// the pipeline unchanged.
#[async_trait]
pub trait ImageSanitizer: Send + Sync {
    async fn sanitize(
        &self,
        messages: &[Message],
        scope: &str,
        options: ImageSanitizeOptions,
    ) -> Result<Vec<Message>>;
}

///
/// Default image sanitizer driven by [`ImageConfig`].
#[derive(Debug, Clone)]
pub struct DefaultImageSanitizer {
    max_image_bytes: usize,
    allowed_mime_types: Vec<String>,
}

/* --- implementations --------------------------------------------------------------------- */

impl Default for DefaultImageSanitizer {
    fn default() -> Self {
        Self::new(&ImageConfig::default())
    }
}

impl DefaultImageSanitizer {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            max_image_bytes: config.max_image_bytes,
            allowed_mime_types: config.allowed_mime_types.iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// Why an image would be rejected, or `None` when it is acceptable.
    fn rejection_reason(&self, image: &ImageBlock) -> Option<String> {
        let raw = image.data_str().unwrap_or("").trim();
        let (data_url_mime, payload) = split_data_url(raw);
        let mime = image.mime_type_str().or(data_url_mime).unwrap_or("").to_lowercase();

        if payload.is_empty() {
            return Some("empty image data".to_string());
        }
        if !self.allowed_mime_types.iter().any(|allowed| *allowed == mime) {
            return Some(format!("unsupported mime type '{}'", mime));
        }
        match STANDARD.decode(payload) {
            Ok(bytes) if bytes.is_empty() => Some("empty image data".to_string()),
            Ok(bytes) if bytes.len() > self.max_image_bytes => Some(format!(
                "{} bytes exceeds limit of {} bytes",
                bytes.len(),
                self.max_image_bytes
            )),
            Ok(_) => None,
            Err(e) => Some(format!("invalid base64 ({})", e)),
        }
    }

    /// Validate images in a block list. Returns `None` when nothing changed.
    fn sanitize_blocks(&self, blocks: &[ContentBlock], scope: &str) -> Option<Vec<ContentBlock>> {
        let mut changed = false;
        let next = blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Image(image) => match self.rejection_reason(image) {
                    Some(reason) => {
                        changed = true;
                        tracing::debug!(scope, reason = %reason, "Omitting image payload");
                        ContentBlock::text(format!("[{}] omitted image payload: {}", scope, reason))
                    }
                    None => block.clone(),
                },
                other => other.clone(),
            })
            .collect();
        changed.then_some(next)
    }
}

#[async_trait]
impl ImageSanitizer for DefaultImageSanitizer {
    async fn sanitize(
        &self,
        messages: &[Message],
        scope: &str,
        options: ImageSanitizeOptions,
    ) -> Result<Vec<Message>> {
        let mut out: Vec<Message> = messages
            .iter()
            .map(|msg| match msg.blocks().and_then(|blocks| self.sanitize_blocks(blocks, scope)) {
                Some(blocks) => msg.with_content(MessageContent::Blocks(blocks)),
                None => msg.clone(),
            })
            .collect();

        if options.sanitize_tool_call_ids {
            sanitize_tool_call_ids(&mut out);
        }
        if options.enforce_tool_call_last {
            enforce_tool_call_last(&mut out);
        }
        Ok(out)
    }
}

/* --- tool call ids --------------------------------------------------------------------------- */

/// Whether an id already satisfies the Cloud Code Assist grammar `[A-Za-z0-9_-]{1,64}`.
pub fn is_valid_cloud_code_assist_tool_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_TOOL_CALL_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Map an arbitrary id into the Cloud Code Assist grammar.
pub fn sanitize_tool_call_id(id: &str) -> String {
    let mut out: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(MAX_TOOL_CALL_ID_LEN)
        .collect();
    if out.is_empty() {
        out.push_str("tool_call");
    }
    out
}

/// Assigns each original id a unique sanitized id, stable within one history.
#[derive(Default)]
struct ToolCallIdMap {
    assigned: HashMap<String, String>,
    taken: HashMap<String, String>,
}

impl ToolCallIdMap {
    fn resolve(&mut self, original: &str) -> String {
        if let Some(id) = self.assigned.get(original) {
            return id.clone();
        }
        let base = sanitize_tool_call_id(original);
        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.get(&candidate).is_some_and(|owner| owner != original) {
            let suffix = format!("_{}", n);
            let keep = MAX_TOOL_CALL_ID_LEN.saturating_sub(suffix.len()).min(base.len());
            candidate = format!("{}{}", &base[..keep], suffix);
            n += 1;
        }
        self.taken.insert(candidate.clone(), original.to_string());
        self.assigned.insert(original.to_string(), candidate.clone());
        candidate
    }

    fn rewrite(&mut self, id: &mut Option<Value>) {
        // valid ids go through the map too so they claim their slot; non-string ids are left alone
        if let Some(Value::String(current)) = id {
            if !current.is_empty() {
                *current = self.resolve(current);
            }
        }
    }
}

/// Rewrite tool-call ids and every reference to them consistently.
fn sanitize_tool_call_ids(messages: &mut [Message]) {
    let mut ids = ToolCallIdMap::default();
    for msg in messages.iter_mut() {
        ids.rewrite(&mut msg.tool_call_id);
        ids.rewrite(&mut msg.tool_use_id);
        if let MessageContent::Blocks(blocks) = &mut msg.content {
            for block in blocks.iter_mut() {
                if let Some(call) = block.as_tool_call_mut() {
                    ids.rewrite(&mut call.id);
                    ids.rewrite(&mut call.tool_call_id);
                } else if let ContentBlock::ToolResult(result) = block {
                    ids.rewrite(&mut result.tool_call_id);
                }
            }
        }
    }
}

/// Drop assistant blocks that follow the last tool invocation.
fn enforce_tool_call_last(messages: &mut [Message]) {
    for msg in messages.iter_mut().filter(|msg| msg.role == Role::Assistant) {
        if let MessageContent::Blocks(blocks) = &mut msg.content {
            if let Some(last) = blocks.iter().rposition(|block| block.as_tool_call().is_some()) {
                if last + 1 < blocks.len() {
                    tracing::debug!(
                        dropped = blocks.len() - last - 1,
                        "Dropping assistant blocks after last tool call"
                    );
                    blocks.truncate(last + 1);
                }
            }
        }
    }
}

/// Split `data:<mime>;base64,<payload>` into its mime type and payload.
fn split_data_url(raw: &str) -> (Option<&str>, &str) {
    if let Some(rest) = raw.strip_prefix("data:") {
        if let Some((header, payload)) = rest.split_once(',') {
            let mime = header.split(';').next().filter(|m| !m.is_empty());
            return (mime, payload);
        }
    }
    (None, raw)
}

/* --- tests ----------------------------------------------------------------------------------- */
