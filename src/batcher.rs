//! Batch splitting under the token budget.
//!
//! A chatroom's daily messages (enriched, chronologically sorted, filtered)
//! are cut into batches sized for one classification call. A batch closes
//! when the next message would exceed either the soft token budget or the
//! hard message cap. Order is preserved and no message lands in two
//! batches; a single oversized message still gets its own batch rather
//! than being truncated or dropped.

use crate::config::BatchOptions;
use crate::formatter;
use crate::internals::tokens::{estimate_tokens, estimate_total};
use crate::records::EnrichedMessage;
use crate::store::OcrCache;

use chrono::NaiveDateTime;
use std::collections::HashMap;

/// One classification-sized slice of a chatroom's day.
///
/// Owns its messages with dense 1-based sequence IDs assigned, the
/// rendered lines sent to the model, and the `seq_id -> msg_id` table used
/// to resolve the model's index references.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Zero-based batch number within the chatroom.
    pub index: usize,
    /// Messages in input order, `seq_id` set to 1..=N.
    pub messages: Vec<EnrichedMessage>,
    /// One rendered line per message, same order.
    pub lines: Vec<String>,
    /// Sequence-ID resolution table. Injective by construction.
    pub seq_to_msg: HashMap<usize, String>,
    /// Estimated token cost of the rendered lines.
    pub token_estimate: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Inclusive timestamp span of the batch's messages.
    pub fn time_range(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let mut times = self.messages.iter().filter_map(|m| m.timestamp);
        let first = times.next();
        let last = self.messages.iter().rev().filter_map(|m| m.timestamp).next();
        (first, last.or(first))
    }
}

/// Split messages into batches by token estimate and message count.
///
/// Empty input produces zero batches.
pub fn split_batches(
    messages: Vec<EnrichedMessage>,
    options: &BatchOptions,
    ocr: Option<&OcrCache>,
) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<EnrichedMessage> = Vec::new();
    let mut current_tokens = 0usize;

    for message in messages {
        let cost = estimate_tokens(&formatter::display_text(&message, ocr));
        let would_overflow = !current.is_empty()
            && (current_tokens + cost > options.max_tokens
                || current.len() + 1 > options.max_messages);

        if would_overflow {
            batches.push(seal_batch(batches.len(), std::mem::take(&mut current), ocr));
            current_tokens = 0;
        }

        current_tokens += cost;
        current.push(message);
    }

    if !current.is_empty() {
        batches.push(seal_batch(batches.len(), current, ocr));
    }

    batches
}

/// Assign sequence IDs, render lines, and build the resolution table.
fn seal_batch(index: usize, mut messages: Vec<EnrichedMessage>, ocr: Option<&OcrCache>) -> Batch {
    for (position, message) in messages.iter_mut().enumerate() {
        message.seq_id = position + 1;
    }

    let lines = formatter::render_batch(&messages, ocr);
    let seq_to_msg = messages
        .iter()
        .map(|m| (m.seq_id, m.msg_id.clone()))
        .collect();
    let token_estimate = estimate_total(lines.iter().map(String::as_str));

    Batch {
        index,
        messages,
        lines,
        seq_to_msg,
        token_estimate,
    }
}
