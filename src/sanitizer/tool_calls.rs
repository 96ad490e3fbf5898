//!
//! Tool-call signature downgrade.
//!
//! Gemini refuses to replay function calls that lack a `thought_signature`. Such
//! invocations are rewritten as descriptive text, and the tool results answering
//! them become plain user turns so the model still sees what happened.
//!
//! Results are matched strictly by id against calls seen earlier in the same pass.
//! A downgraded result is emitted after the tool results that still answer signed
//! calls of the same assistant turn, so pairing repair leaves the output alone.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::Value;

use crate::message::{ContentBlock, Message, MessageContent, Role, ToolCallBlock};

/* --- start of code -------------------------------------------------------------------------- */

///
/// Downgrade unsigned tool invocations and the tool results that answer them.
///
/// # Arguments
///  * `messages` - history to inspect; never modified
///
/// # Returns
///  * `Cow::Borrowed(messages)` when no invocation lacked a signature
///  * `Cow::Owned` with text renderings in place of unsigned calls and their results
pub fn downgrade_tool_call_history(messages: &[Message]) -> Cow<'_, [Message]> {
    let has_unsigned = messages
        .iter()
        .any(|msg| msg.role == Role::Assistant && msg.blocks().is_some_and(|b| b.iter().any(is_unsigned_call)));
    if !has_unsigned {
        return Cow::Borrowed(messages);
    }

    let mut downgraded_ids: HashSet<String> = HashSet::new();
    let mut calls = 0usize;
    let mut results = 0usize;
    let mut out = Vec::with_capacity(messages.len());
    // user renderings waiting for the run of tool results to end
    let mut pending: Vec<Message> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::ToolResult => match msg.tool_result_id() {
                Some(id) if downgraded_ids.contains(id) => {
                    results += 1;
                    pending.push(tool_result_as_user(id, &msg.content));
                }
                _ => out.push(msg.clone()),
            },
            Role::Assistant => {
                out.append(&mut pending);
                let next = downgrade_assistant(msg, &mut downgraded_ids, &mut calls);
                out.push(next.unwrap_or_else(|| msg.clone()));
            }
            _ => {
                out.append(&mut pending);
                out.push(msg.clone());
            }
        }
    }
    out.append(&mut pending);

    tracing::debug!(calls, results, ids = downgraded_ids.len(), "Downgraded unsigned tool calls to text");
    Cow::Owned(out)
}

/// Replace unsigned invocations in an assistant message, recording their ids.
fn downgrade_assistant(msg: &Message, ids: &mut HashSet<String>, calls: &mut usize) -> Option<Message> {
    let blocks = msg.blocks()?;
    if !blocks.iter().any(is_unsigned_call) {
        return None;
    }

    let next = blocks
        .iter()
        .map(|block| match block.as_tool_call() {
            Some((_, call)) if !call.has_thought_signature() => {
                if let Some(id) = call.call_id() {
                    ids.insert(id.to_string());
                }
                *calls += 1;
                ContentBlock::text(render_tool_call(call))
            }
            _ => block.clone(),
        })
        .collect();

    Some(msg.with_content(MessageContent::Blocks(next)))
}

fn is_unsigned_call(block: &ContentBlock) -> bool {
    block.as_tool_call().is_some_and(|(_, call)| !call.has_thought_signature())
}

/// `[Tool Call: <name> (ID: <id>)]` followed by the arguments.
fn render_tool_call(call: &ToolCallBlock) -> String {
    let name = call.tool_name().unwrap_or("unknown");
    let id_part = call.call_id().map(|id| format!(" (ID: {})", id)).unwrap_or_default();
    let args = match call.arguments() {
        Some(Value::String(s)) => s.clone(),
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        None => "null".to_string(),
    };
    format!("[Tool Call: {}{}]\nArguments: {}", name, id_part, args)
}

/// Rewrite a tool result as a user message with a single text block.
fn tool_result_as_user(id: &str, content: &MessageContent) -> Message {
    let text = match content {
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|block| match block.text_value() {
                Some(text) => text.to_string(),
                None => compact_json(block),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        MessageContent::Absent => "null".to_string(),
        other => compact_json(other),
    };

    Message::with_blocks(
        Role::User,
        vec![ContentBlock::text(format!("[Tool Result for ID {}]\n{}", id, text))],
    )
}

fn compact_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history(raw: Value) -> Vec<Message> {
        serde_json::from_value(raw).expect("valid history")
    }

    fn only_text(msg: &Message) -> &str {
        match msg.blocks().expect("blocks") {
            [block] => block.text_value().expect("text block"),
            other => panic!("expected a single block, got {:?}", other),
        }
    }

    #[test]
    fn test_unsigned_call_and_result_downgraded() {
        let input = history(json!([
            { "role": "user", "content": "list files" },
            { "role": "assistant", "content": [
                { "type": "toolCall", "id": "call_1", "name": "ls", "arguments": { "path": "/tmp", "all": true } }
            ]},
            { "role": "toolResult", "toolCallId": "call_1", "toolName": "ls",
              "content": [{ "type": "text", "text": "a.txt" }, { "type": "text", "text": "b.txt" }] }
        ]));

        let out = downgrade_tool_call_history(&input);

        assert_eq!(
            only_text(&out[1]),
            "[Tool Call: ls (ID: call_1)]\nArguments: {\n  \"path\": \"/tmp\",\n  \"all\": true\n}"
        );
        assert_eq!(out[2].role, Role::User);
        assert_eq!(only_text(&out[2]), "[Tool Result for ID call_1]\na.txt\nb.txt");
        assert!(out[2].extra.is_empty());
        assert_eq!(out[2].tool_call_id, None);
    }

    #[test]
    fn test_signed_call_kept() {
        let input = history(json!([
            { "role": "assistant", "content": [
                { "type": "functionCall", "id": "c", "name": "x", "arguments": {}, "thought_signature": "sig" }
            ]},
            { "role": "toolResult", "toolCallId": "c", "content": [{ "type": "text", "text": "r" }] }
        ]));

        assert!(matches!(downgrade_tool_call_history(&input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_all_synonyms_and_fallback_fields() {
        let input = history(json!([
            { "role": "assistant", "content": [
                { "type": "toolUse", "toolCallId": "u1", "toolName": "grep", "input": "pattern" },
                { "type": "functionCall", "arguments": [1, 2] },
                { "type": "text", "text": "done" }
            ]}
        ]));

        let out = downgrade_tool_call_history(&input);
        let blocks = out[0].blocks().unwrap();
        assert_eq!(blocks[0].text_value(), Some("[Tool Call: grep (ID: u1)]\nArguments: pattern"));
        assert_eq!(blocks[1].text_value(), Some("[Tool Call: unknown]\nArguments: [\n  1,\n  2\n]"));
        assert_eq!(blocks[2].text_value(), Some("done"));
    }

    #[test]
    fn test_missing_arguments_render_null() {
        let call = ToolCallBlock { name: Some(json!("noop")), ..Default::default() };
        assert_eq!(render_tool_call(&call), "[Tool Call: noop]\nArguments: null");
    }

    #[test]
    fn test_only_downgraded_ids_are_correlated() {
        let input = history(json!([
            { "role": "assistant", "content": [
                { "type": "toolCall", "id": "a", "name": "one", "arguments": {} },
                { "type": "toolCall", "id": "b", "name": "two", "arguments": {}, "thought_signature": "s" }
            ]},
            { "role": "toolResult", "toolCallId": "b", "content": [{ "type": "text", "text": "B" }] },
            { "role": "toolResult", "toolCallId": "a", "content": [{ "type": "text", "text": "A" }] }
        ]));

        let out = downgrade_tool_call_history(&input);
        assert_eq!(out[1], input[1]);
        assert_eq!(out[2].role, Role::User);
        assert_eq!(only_text(&out[2]), "[Tool Result for ID a]\nA");
        // signed call survives in place
        assert!(out[0].blocks().unwrap()[1].as_tool_call().is_some());
    }

    #[test]
    fn test_downgraded_result_follows_signed_results() {
        let input = history(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "content": [
                { "type": "toolCall", "id": "a", "name": "one", "arguments": {} },
                { "type": "toolCall", "id": "b", "name": "two", "arguments": {}, "thought_signature": "s" }
            ]},
            { "role": "toolResult", "toolCallId": "a", "content": [{ "type": "text", "text": "A" }] },
            { "role": "toolResult", "toolCallId": "b", "content": [{ "type": "text", "text": "B" }] },
            { "role": "user", "content": "next" }
        ]));

        let out = downgrade_tool_call_history(&input);
        let roles: Vec<Role> = out.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::ToolResult, Role::User, Role::User]);
        assert_eq!(out[2], input[3]);
        assert_eq!(only_text(&out[3]), "[Tool Result for ID a]\nA");
        assert_eq!(out[4], input[4]);
    }

    #[test]
    fn test_null_arguments_render_null() {
        let input = history(json!([
            { "role": "assistant", "content": [
                { "type": "toolCall", "id": "n", "name": "noop", "arguments": null, "input": { "x": 1 } }
            ]}
        ]));

        let out = downgrade_tool_call_history(&input);
        assert_eq!(only_text(&out[0]), "[Tool Call: noop (ID: n)]\nArguments: null");
    }

    #[test]
    fn test_result_before_call_is_not_matched() {
        let input = history(json!([
            { "role": "toolResult", "toolCallId": "late", "content": [] },
            { "role": "assistant", "content": [{ "type": "toolCall", "id": "late", "name": "t" }] }
        ]));

        let out = downgrade_tool_call_history(&input);
        assert_eq!(out[0], input[0]);
    }

    #[test]
    fn test_tool_use_id_field_and_non_text_content() {
        let input = history(json!([
            { "role": "assistant", "content": [{ "type": "toolCall", "id": "x1", "name": "img" }] },
            { "role": "toolResult", "toolUseId": "x1",
              "content": [{ "type": "image", "data": "AAAA", "mimeType": "image/png" }] },
            { "role": "assistant", "content": [{ "type": "toolCall", "id": "x2", "name": "raw" }] },
            { "role": "toolResult", "toolCallId": "x2", "content": "plain" }
        ]));

        let out = downgrade_tool_call_history(&input);
        assert_eq!(
            only_text(&out[1]),
            "[Tool Result for ID x1]\n{\"type\":\"image\",\"data\":\"AAAA\",\"mimeType\":\"image/png\"}"
        );
        assert_eq!(only_text(&out[3]), "[Tool Result for ID x2]\n\"plain\"");
    }

    #[test]
    fn test_idempotent() {
        let input = history(json!([
            { "role": "assistant", "content": [{ "type": "toolCall", "id": "c", "name": "t", "arguments": {} }] },
            { "role": "toolResult", "toolCallId": "c", "content": [{ "type": "text", "text": "r" }] }
        ]));

        let once = downgrade_tool_call_history(&input).into_owned();
        assert!(matches!(downgrade_tool_call_history(&once), Cow::Borrowed(_)));
    }
}
