//!
//! Tool invocation / tool result pairing repair.
//!
//! Every backend expects each tool invocation to be answered by exactly one tool
//! result, placed directly after the assistant turn that issued it. Histories
//! recorded across crashes, retries and aborted turns break that rule in a handful of
//! recurring ways; the default repairer fixes them:
//!
//! - results that drifted behind other turns are moved back after their call
//! - calls that were never answered get a synthetic error result
//! - repeated results for the same call are dropped
//! - results answering no earlier call are dropped
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashSet;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::Result;
use crate::message::{ContentBlock, Message, Role};

/* --- constants ------------------------------------------------------------------------------ */

/// Text of a synthesized tool result
pub const SYNTHETIC_RESULT_TEXT: &str =
    "[histguard] missing tool result in session history; inserted synthetic error result for transcript repair.";

/* --- types ----------------------------------------------------------------------------------- */

///
/// Pairing repair collaborator. Synchronous; errors propagate out of the pipeline.
pub trait PairingRepairer: Send + Sync {
    fn repair(&self, messages: &[Message]) -> Result<Vec<Message>>;
}

/// Statistics from a repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// Results moved to follow their invocation.
    pub results_reordered: usize,
    /// Synthetic error results inserted for unanswered invocations.
    pub synthetic_results_inserted: usize,
    /// Repeated results for an already answered invocation.
    pub duplicates_removed: usize,
    /// Results with no earlier matching invocation.
    pub orphaned_results_removed: usize,
}

/// Default, backend-agnostic pairing repairer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPairingRepairer;

/* --- implementations --------------------------------------------------------------------- */

impl PairingRepairer for DefaultPairingRepairer {
    fn repair(&self, messages: &[Message]) -> Result<Vec<Message>> {
        Ok(self.repair_with_stats(messages).0)
    }
}

impl DefaultPairingRepairer {
    ///
    /// Repair a history and report what was changed.
    ///
    /// Each assistant turn with tool invocations owns the messages up to the next
    /// assistant turn. Within that span its results are pulled forward in call order,
    /// and the rest of the span keeps its relative order.
    pub fn repair_with_stats(&self, messages: &[Message]) -> (Vec<Message>, RepairStats) {
        let mut stats = RepairStats::default();
        let mut out: Vec<Message> = Vec::with_capacity(messages.len());
        let mut answered: HashSet<String> = HashSet::new();

        let mut idx = 0;
        while idx < messages.len() {
            let msg = &messages[idx];
            let call_ids = invocation_ids(msg);

            if call_ids.is_empty() {
                match msg.role {
                    Role::ToolResult if msg.tool_result_id().is_some() => {
                        drop_unmatched(msg, &answered, &mut stats);
                    }
                    _ => out.push(msg.clone()),
                }
                idx += 1;
                continue;
            }

            let end = messages[idx + 1..]
                .iter()
                .position(|m| m.role == Role::Assistant)
                .map_or(messages.len(), |offset| idx + 1 + offset);
            let span = &messages[idx + 1..end];

            out.push(msg.clone());
            let mut used = vec![false; span.len()];
            for (slot, call_id) in call_ids.iter().enumerate() {
                if answered.contains(call_id) {
                    continue;
                }
                let found = span.iter().enumerate().position(|(i, m)| {
                    !used[i] && m.role == Role::ToolResult && m.tool_result_id() == Some(call_id.as_str())
                });
                match found {
                    Some(i) => {
                        used[i] = true;
                        if i != slot {
                            stats.results_reordered += 1;
                        }
                        out.push(span[i].clone());
                    }
                    None => {
                        stats.synthetic_results_inserted += 1;
                        out.push(synthetic_result(call_id));
                    }
                }
                answered.insert(call_id.clone());
            }

            for (m, _) in span.iter().zip(&used).filter(|(_, used)| !**used) {
                match m.role {
                    Role::ToolResult if m.tool_result_id().is_some() => {
                        drop_unmatched(m, &answered, &mut stats);
                    }
                    _ => out.push(m.clone()),
                }
            }
            idx = end;
        }

        if stats != RepairStats::default() {
            warn!(
                reordered = stats.results_reordered,
                synthetic = stats.synthetic_results_inserted,
                duplicates = stats.duplicates_removed,
                orphaned = stats.orphaned_results_removed,
                "Tool pairing repair applied fixes"
            );
        }
        (out, stats)
    }
}

/* --- helpers --------------------------------------------------------------------------------- */

/// Ids of the tool invocations in an assistant message, in block order, deduplicated.
fn invocation_ids(msg: &Message) -> Vec<String> {
    if msg.role != Role::Assistant {
        return Vec::new();
    }
    let mut ids: Vec<String> = Vec::new();
    for block in msg.blocks().unwrap_or_default() {
        if let Some(id) = block.as_tool_call().and_then(|(_, call)| call.call_id()) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Count a result that has no slot: a repeat of an answered call, or an orphan.
fn drop_unmatched(msg: &Message, answered: &HashSet<String>, stats: &mut RepairStats) {
    let id = msg.tool_result_id().unwrap_or_default();
    if answered.contains(id) {
        stats.duplicates_removed += 1;
        debug!(tool_call_id = id, "Dropping duplicate tool result");
    } else {
        stats.orphaned_results_removed += 1;
        debug!(tool_call_id = id, "Dropping orphaned tool result");
    }
}

fn synthetic_result(call_id: &str) -> Message {
    let mut msg = Message::with_blocks(Role::ToolResult, vec![ContentBlock::text(SYNTHETIC_RESULT_TEXT)]);
    msg.tool_call_id = Some(Value::from(call_id));
    msg.extra.insert("isError".to_string(), Value::Bool(true));
    msg.extra.insert("timestamp".to_string(), json!(chrono::Utc::now().timestamp_millis()));
    msg
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn history(raw: Value) -> Vec<Message> {
        serde_json::from_value(raw).expect("valid history")
    }

    fn roles_and_ids(messages: &[Message]) -> Vec<(Role, Option<String>)> {
        messages
            .iter()
            .map(|m| (m.role.clone(), m.tool_result_id().map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_well_formed_history_unchanged() {
        let input = history(json!([
            { "role": "user", "content": "go" },
            { "role": "assistant", "content": [
                { "type": "toolCall", "id": "a", "name": "x" },
                { "type": "toolCall", "id": "b", "name": "y" }
            ]},
            { "role": "toolResult", "toolCallId": "a", "content": [] },
            { "role": "toolResult", "toolCallId": "b", "content": [] },
            { "role": "assistant", "content": "done" }
        ]));

        let (out, stats) = DefaultPairingRepairer.repair_with_stats(&input);
        assert_eq!(out, input);
        assert_eq!(stats, RepairStats::default());
    }

    #[test]
    fn test_displaced_results_moved_after_call() {
        let input = history(json!([
            { "role": "assistant", "content": [
                { "type": "toolUse", "id": "a", "name": "x" },
                { "type": "toolUse", "id": "b", "name": "y" }
            ]},
            { "role": "user", "content": "interrupt" },
            { "role": "toolResult", "toolCallId": "b", "content": [] },
            { "role": "toolResult", "toolUseId": "a", "content": [] }
        ]));

        let (out, stats) = DefaultPairingRepairer.repair_with_stats(&input);
        assert_eq!(
            roles_and_ids(&out),
            vec![
                (Role::Assistant, None),
                (Role::ToolResult, Some("a".to_string())),
                (Role::ToolResult, Some("b".to_string())),
                (Role::User, None),
            ]
        );
        assert_eq!(stats.results_reordered, 1);
    }

    #[test]
    fn test_missing_result_synthesized() {
        let input = history(json!([
            { "role": "assistant", "content": [{ "type": "functionCall", "id": "lost", "name": "x" }] },
            { "role": "user", "content": "next" }
        ]));

        let (out, stats) = DefaultPairingRepairer.repair_with_stats(&input);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].role, Role::ToolResult);
        assert_eq!(out[1].tool_result_id(), Some("lost"));
        assert_eq!(out[1].extra.get("isError"), Some(&Value::Bool(true)));
        assert_eq!(out[1].blocks().unwrap()[0].text_value(), Some(SYNTHETIC_RESULT_TEXT));
        assert_eq!(stats.synthetic_results_inserted, 1);
    }

    #[test]
    fn test_duplicates_and_orphans_dropped() {
        let input = history(json!([
            { "role": "toolResult", "toolCallId": "early", "content": [] },
            { "role": "assistant", "content": [{ "type": "toolCall", "id": "a", "name": "x" }] },
            { "role": "toolResult", "toolCallId": "a", "content": "first" },
            { "role": "toolResult", "toolCallId": "a", "content": "again" },
            { "role": "toolResult", "toolCallId": "ghost", "content": [] },
            { "role": "assistant", "content": "ok" },
            { "role": "toolResult", "toolCallId": "a", "content": "late" }
        ]));

        let (out, stats) = DefaultPairingRepairer.repair_with_stats(&input);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].content, crate::message::MessageContent::Text("first".to_string()));
        assert_eq!(stats.duplicates_removed, 2);
        assert_eq!(stats.orphaned_results_removed, 2);
    }

    #[test]
    fn test_result_without_id_passes_through() {
        let input = history(json!([
            { "role": "toolResult", "content": "no id" }
        ]));
        assert_eq!(DefaultPairingRepairer.repair(&input).unwrap(), input);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let input = history(json!([
            { "role": "assistant", "content": [
                { "type": "toolCall", "id": "a", "name": "x" },
                { "type": "toolCall", "id": "b", "name": "y" }
            ]},
            { "role": "toolResult", "toolCallId": "b", "content": [] }
        ]));

        let once = DefaultPairingRepairer.repair(&input).unwrap();
        let (twice, stats) = DefaultPairingRepairer.repair_with_stats(&once);
        assert_eq!(twice, once);
        assert_eq!(stats, RepairStats::default());
    }
}
