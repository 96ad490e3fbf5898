//!
//! Thinking-block signature downgrade.
//!
//! Gemini rejects replayed reasoning that lacks its continuation signature. Unsigned
//! `thinking` blocks in assistant turns are turned into plain text carrying the
//! original reasoning; blocks with nothing but whitespace are dropped, and so is an
//! assistant turn left without content.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::borrow::Cow;

use super::{Rewrite, rewrite_messages};
use crate::message::{ContentBlock, Message, MessageContent, Role};

/* --- start of code -------------------------------------------------------------------------- */

///
/// Downgrade unsigned thinking blocks in assistant messages.
///
/// # Arguments
///  * `messages` - history to inspect; never modified
///
/// # Returns
///  * `Cow::Borrowed(messages)` when nothing needed downgrading
///  * `Cow::Owned` with downgraded blocks otherwise; block and message order is kept
pub fn downgrade_thinking_blocks(messages: &[Message]) -> Cow<'_, [Message]> {
    let mut downgraded = 0usize;
    let mut dropped_messages = 0usize;

    let out = rewrite_messages(messages, |msg| {
        let rewrite = downgrade_message(msg, &mut downgraded);
        if matches!(rewrite, Rewrite::Drop) {
            dropped_messages += 1;
        }
        rewrite
    });

    if downgraded > 0 {
        tracing::debug!(downgraded, dropped_messages, "Downgraded unsigned thinking blocks");
    }
    out
}

/// Rewrite one message, counting downgraded blocks.
fn downgrade_message(msg: &Message, downgraded: &mut usize) -> Rewrite {
    if msg.role != Role::Assistant {
        return Rewrite::Keep;
    }
    let Some(blocks) = msg.blocks() else {
        return Rewrite::Keep;
    };
    if !blocks.iter().any(is_unsigned_thinking) {
        return Rewrite::Keep;
    }

    let next: Vec<ContentBlock> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Thinking(thinking) if !thinking.is_signed() => {
                *downgraded += 1;
                let reasoning = thinking.reasoning();
                if reasoning.trim().is_empty() {
                    None
                } else {
                    Some(ContentBlock::text(reasoning))
                }
            }
            other => Some(other.clone()),
        })
        .collect();

    if next.is_empty() {
        Rewrite::Drop
    } else {
        Rewrite::Replace(msg.with_content(MessageContent::Blocks(next)))
    }
}

fn is_unsigned_thinking(block: &ContentBlock) -> bool {
    matches!(block, ContentBlock::Thinking(thinking) if !thinking.is_signed())
}

/* --- tests ----------------------------------------------------------------------------------- */
