//!
//! Message and content-block model for agent conversation histories.
//!
//! Mirrors the JSON shape agents persist in their session transcripts: every message
//! has a `role` and a `content` that is either a plain string or an ordered list of
//! typed blocks. Unknown roles, unknown block types and non-object entries are kept
//! verbatim so that a history always round-trips, even when parts of it are malformed.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/* --- helper functions ----------------------------------------------------------------------- */

/// Keep a field exactly as written, `null` included. Absence stays `None` via `default`.
fn raw_field<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// String view of a raw field; any other JSON type reads as absent.
fn field_str(field: &Option<Value>) -> Option<&str> {
    field.as_ref().and_then(Value::as_str)
}

/// JavaScript-style truthiness, used for signature markers of unknown type.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/* --- types ----------------------------------------------------------------------------------- */

///
/// Role of the message author.
///
/// Unrecognised role strings are preserved as [`Role::Other`] and never transformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "toolResult")]
    ToolResult,
    #[serde(rename = "system")]
    System,
    #[serde(untagged)]
    Other(String),
}

///
/// One turn in a conversation.
///
/// Only the fields the pipeline inspects are typed; everything else (timestamps,
/// usage, provider metadata, tool names, error flags) lives in `extra` and is
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /** author role */
    pub role: Role,
    /** string or block content */
    #[serde(default, skip_serializing_if = "MessageContent::is_absent")]
    pub content: MessageContent,
    /** correlation id of a tool result (current field name) */
    #[serde(
        rename = "toolCallId",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_call_id: Option<Value>,
    /** correlation id of a tool result (historical field name) */
    #[serde(
        rename = "toolUseId",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_use_id: Option<Value>,
    /** all remaining fields, kept verbatim */
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

///
/// Message content: a plain string, an ordered block list, or anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /** plain string content */
    Text(String),
    /** ordered content blocks */
    Blocks(Vec<ContentBlock>),
    /** malformed content, `null` included, passed through untouched */
    Other(Value),
    /** no `content` field at all */
    #[serde(skip)]
    Absent,
}

///
/// Tag names that all denote a tool invocation.
///
/// Different backends emitted different tags over time; they are one logical
/// variant and keep their original tag when written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCallTag {
    ToolCall,
    FunctionCall,
    ToolUse,
}

///
/// A single content block, keyed by its JSON `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text(TextBlock),
    #[serde(rename = "thinking")]
    Thinking(ThinkingBlock),
    #[serde(rename = "toolCall")]
    ToolCall(ToolCallBlock),
    #[serde(rename = "functionCall")]
    FunctionCall(ToolCallBlock),
    #[serde(rename = "toolUse")]
    ToolUse(ToolCallBlock),
    #[serde(rename = "toolResult")]
    ToolResult(ToolResultBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    /** unknown block type or non-object entry */
    #[serde(untagged)]
    Other(Value),
}

/// Plain text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Model reasoning, optionally carrying a continuation signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub thinking: Option<Value>,
    #[serde(
        rename = "thinkingSignature",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub thinking_signature: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tool invocation issued by the assistant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBlock {
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(
        rename = "toolCallId",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_call_id: Option<Value>,
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(
        rename = "toolName",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_name: Option<Value>,
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /** signature Gemini requires to replay a function call */
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tool result embedded as a block (Anthropic-style histories).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    #[serde(
        rename = "toolCallId",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_call_id: Option<Value>,
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inline image, base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default, deserialize_with = "raw_field", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(
        rename = "mimeType",
        default,
        deserialize_with = "raw_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/* --- implementations --------------------------------------------------------------------- */

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Absent
    }
}

impl MessageContent {
    /// True when the message carried no `content` field at all.
    pub fn is_absent(&self) -> bool {
        matches!(self, MessageContent::Absent)
    }

    /// Block list, if the content is one.
    pub fn blocks(&self) -> Option<&[ContentBlock]> {
        match self {
            MessageContent::Blocks(blocks) => Some(blocks),
            _ => None,
        }
    }
}

impl Message {
    /// Build a message from a role and content with no extra fields.
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self { role, content, tool_call_id: None, tool_use_id: None, extra: Map::new() }
    }

    /// Build a user message with plain string content.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    /// Build a message whose content is a block list.
    pub fn with_blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self::new(role, MessageContent::Blocks(blocks))
    }

    /// Copy of this message with its content replaced; every other field is kept.
    pub fn with_content(&self, content: MessageContent) -> Self {
        Self {
            role: self.role.clone(),
            content,
            tool_call_id: self.tool_call_id.clone(),
            tool_use_id: self.tool_use_id.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Block list of this message, if any.
    pub fn blocks(&self) -> Option<&[ContentBlock]> {
        self.content.blocks()
    }

    ///
    /// Correlation id of a tool result message.
    ///
    /// Precedence: a non-empty `toolCallId` wins over `toolUseId`; when both are
    /// present with different values the `toolUseId` value is ignored.
    pub fn tool_result_id(&self) -> Option<&str> {
        field_str(&self.tool_call_id)
            .filter(|id| !id.is_empty())
            .or_else(|| field_str(&self.tool_use_id).filter(|id| !id.is_empty()))
    }
}

impl ToolCallTag {
    /// Every tag that denotes a tool invocation.
    pub const ALL: [ToolCallTag; 3] =
        [ToolCallTag::ToolCall, ToolCallTag::FunctionCall, ToolCallTag::ToolUse];

    /// Wire name of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolCallTag::ToolCall => "toolCall",
            ToolCallTag::FunctionCall => "functionCall",
            ToolCallTag::ToolUse => "toolUse",
        }
    }

    /// Resolve a wire `type` string through the alias table.
    pub fn from_type(block_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == block_type)
    }
}

impl ContentBlock {
    /// New text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextBlock { text: Some(Value::String(text.into())), extra: Map::new() })
    }

    /// Wrap a tool invocation under the given tag.
    pub fn tool_call(tag: ToolCallTag, block: ToolCallBlock) -> Self {
        match tag {
            ToolCallTag::ToolCall => ContentBlock::ToolCall(block),
            ToolCallTag::FunctionCall => ContentBlock::FunctionCall(block),
            ToolCallTag::ToolUse => ContentBlock::ToolUse(block),
        }
    }

    /// View this block as a tool invocation, whichever synonym it was tagged with.
    pub fn as_tool_call(&self) -> Option<(ToolCallTag, &ToolCallBlock)> {
        match self {
            ContentBlock::ToolCall(call) => Some((ToolCallTag::ToolCall, call)),
            ContentBlock::FunctionCall(call) => Some((ToolCallTag::FunctionCall, call)),
            ContentBlock::ToolUse(call) => Some((ToolCallTag::ToolUse, call)),
            _ => None,
        }
    }

    /// Mutable view of a tool invocation.
    pub fn as_tool_call_mut(&mut self) -> Option<&mut ToolCallBlock> {
        match self {
            ContentBlock::ToolCall(call)
            | ContentBlock::FunctionCall(call)
            | ContentBlock::ToolUse(call) => Some(call),
            _ => None,
        }
    }

    /// The block's `text` string, for typed text blocks and unknown blocks alike.
    pub fn text_value(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(block) => field_str(&block.text),
            ContentBlock::Other(value) => value.get("text").and_then(Value::as_str),
            _ => None,
        }
    }
}

impl ToolCallBlock {
    /// Invocation id: `id`, falling back to `toolCallId`. Empty ids count as missing.
    pub fn call_id(&self) -> Option<&str> {
        match self.id {
            Some(_) => field_str(&self.id),
            None => field_str(&self.tool_call_id),
        }
        .filter(|id| !id.is_empty())
    }

    /// Tool name: `name`, falling back to `toolName`.
    pub fn tool_name(&self) -> Option<&str> {
        field_str(&self.name).or(field_str(&self.tool_name))
    }

    /// Arguments: `arguments`, falling back to `input`.
    pub fn arguments(&self) -> Option<&Value> {
        self.arguments.as_ref().or(self.input.as_ref())
    }

    /// Whether the Gemini `thought_signature` marker is present and truthy.
    pub fn has_thought_signature(&self) -> bool {
        self.thought_signature.as_ref().is_some_and(is_truthy)
    }
}

impl ThinkingBlock {
    /// Reasoning text; a missing or non-string `thinking` reads as empty.
    pub fn reasoning(&self) -> &str {
        field_str(&self.thinking).unwrap_or_default()
    }

    /// Whether the block carries a non-blank continuation signature.
    pub fn is_signed(&self) -> bool {
        field_str(&self.thinking_signature).is_some_and(|sig| !sig.trim().is_empty())
    }
}

impl ImageBlock {
    /// Base64 payload, when it is a string.
    pub fn data_str(&self) -> Option<&str> {
        field_str(&self.data)
    }

    /// Declared MIME type, when it is a string.
    pub fn mime_type_str(&self) -> Option<&str> {
        field_str(&self.mime_type)
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_mixed_history() {
        let raw = json!([
            { "role": "user", "content": "hi", "timestamp": 1 },
            {
                "role": "assistant",
                "content": [
                    { "type": "thinking", "thinking": "hmm", "thinkingSignature": "sig" },
                    { "type": "functionCall", "id": "c1", "name": "read", "arguments": { "path": "a" } },
                    { "type": "mystery", "payload": 3 },
                    "bare string"
                ]
            },
            { "role": "toolResult", "toolCallId": "c1", "content": [{ "type": "text", "text": "ok" }] }
        ]);

        let messages: Vec<Message> = serde_json::from_value(raw.clone()).expect("history parses");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, MessageContent::Text("hi".to_string()));

        let blocks = messages[1].blocks().expect("assistant has blocks");
        assert!(matches!(blocks[0], ContentBlock::Thinking(ref t) if t.is_signed()));
        let (tag, call) = blocks[1].as_tool_call().expect("function call");
        assert_eq!(tag, ToolCallTag::FunctionCall);
        assert_eq!(call.call_id(), Some("c1"));
        assert!(matches!(blocks[2], ContentBlock::Other(_)));
        assert!(matches!(blocks[3], ContentBlock::Other(Value::String(_))));
        assert_eq!(messages[2].role, Role::ToolResult);
        assert_eq!(messages[2].tool_result_id(), Some("c1"));

        let written = serde_json::to_value(&messages).expect("history serializes");
        assert_eq!(written, raw);
    }

    #[test]
    fn test_unknown_role_round_trips() {
        let raw = json!({ "role": "developer", "content": "x" });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(msg.role, Role::Other("developer".to_string()));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_non_string_signature_reads_as_unsigned() {
        let block: ContentBlock =
            serde_json::from_value(json!({ "type": "thinking", "thinking": "x", "thinkingSignature": 7 }))
                .unwrap();
        match block {
            ContentBlock::Thinking(thinking) => assert!(!thinking.is_signed()),
            other => panic!("expected thinking block, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_fields_round_trip() {
        let raw = json!([
            {
                "role": "assistant",
                "content": [
                    { "type": "thinking", "thinking": ["x"], "thinkingSignature": 7 },
                    { "type": "toolCall", "id": 42, "name": {}, "arguments": null },
                    { "type": "text", "text": 3 },
                    { "type": "image", "data": false, "mimeType": 9 }
                ]
            },
            { "role": "toolResult", "toolCallId": 5, "content": null }
        ]);

        let messages: Vec<Message> = serde_json::from_value(raw.clone()).unwrap();
        let blocks = messages[0].blocks().unwrap();
        let (_, call) = blocks[1].as_tool_call().unwrap();
        assert_eq!(call.call_id(), None);
        assert_eq!(call.tool_name(), None);
        assert_eq!(call.arguments(), Some(&Value::Null));
        assert_eq!(blocks[2].text_value(), None);
        assert_eq!(messages[1].tool_result_id(), None);
        assert_eq!(messages[1].content, MessageContent::Other(Value::Null));

        assert_eq!(serde_json::to_value(&messages).unwrap(), raw);
    }

    #[test]
    fn test_missing_content_stays_missing() {
        let raw = json!({ "role": "toolResult", "toolCallId": "c1" });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert!(msg.content.is_absent());
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_tool_result_id_precedence() {
        let mut msg = Message::new(Role::ToolResult, MessageContent::Text(String::new()));
        msg.tool_use_id = Some(json!("use-1"));
        assert_eq!(msg.tool_result_id(), Some("use-1"));

        msg.tool_call_id = Some(json!("call-1"));
        assert_eq!(msg.tool_result_id(), Some("call-1"));

        msg.tool_call_id = Some(json!(""));
        assert_eq!(msg.tool_result_id(), Some("use-1"));

        msg.tool_call_id = Some(json!(5));
        assert_eq!(msg.tool_result_id(), Some("use-1"));
    }

    #[test]
    fn test_tool_call_alias_table() {
        for tag in ToolCallTag::ALL {
            assert_eq!(ToolCallTag::from_type(tag.as_str()), Some(tag));
        }
        assert_eq!(ToolCallTag::from_type("text"), None);
    }

    #[test]
    fn test_thought_signature_truthiness() {
        let mut call = ToolCallBlock::default();
        assert!(!call.has_thought_signature());
        call.thought_signature = Some(json!(""));
        assert!(!call.has_thought_signature());
        call.thought_signature = Some(json!(false));
        assert!(!call.has_thought_signature());
        call.thought_signature = Some(json!("abc"));
        assert!(call.has_thought_signature());
    }
}
