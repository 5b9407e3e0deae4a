//! Two-stage topic summarization.
//!
//! Stage 1 drafts a title/category/summary for each token-budget-sized
//! chunk of a topic's messages; stage 2 consolidates the drafts into one.
//! Small topics get a bounded window of neighboring messages for context,
//! which never expands the topic's `message_ids` or its time range.
//!
//! Failure handling mirrors the rest of the pipeline: a failed chunk call
//! drops that draft, a failed stage-2 call falls back to the largest
//! draft, and a topic with no draft at all is still emitted with its first
//! keyword as the title.

use crate::config::{BatchOptions, SummaryOptions};
use crate::debug_writer::DebugWriter;
use crate::error::AnalyzerResult;
use crate::formatter;
use crate::internals::tokens::estimate_tokens;
use crate::logging::log_warn;
use crate::prompts;
use crate::protocol;
use crate::provider::LlmProvider;
use crate::records::EnrichedMessage;
use crate::store::OcrCache;
use crate::topics::{FinalTopic, MergedTopic, SummaryDraft};

use chrono::NaiveDateTime;
use std::collections::BTreeSet;

/// Topics referencing fewer messages than this get neighbor context.
const SMALL_TOPIC_THRESHOLD: usize = 10;

/// Longest title kept on a final topic, in characters.
const TITLE_CHARS: usize = 40;

/// Category used when no summary could be produced at all.
const FALLBACK_CATEGORY: &str = "uncategorized";

pub struct Summarizer<'a> {
    pub provider: &'a dyn LlmProvider,
    pub options: &'a SummaryOptions,
    pub batch_options: &'a BatchOptions,
    pub debug: &'a DebugWriter,
}

/// A chunk of the topic's selected messages, rendered and counted.
struct Chunk {
    lines: Vec<String>,
    matched_count: usize,
}

impl<'a> Summarizer<'a> {
    /// Fill in title, category, summary, and time range for one merged
    /// topic. Never fails; LLM trouble degrades through the fallbacks and
    /// is recorded in `warnings`.
    pub async fn summarize(
        &self,
        chatroom: &str,
        topic_index: usize,
        topic: MergedTopic,
        timeline: &[EnrichedMessage],
        ocr: Option<&OcrCache>,
        warnings: &mut Vec<String>,
    ) -> FinalTopic {
        let (selected, matched_flags, time_range) = self.select_sources(&topic, timeline);
        let chunks = self.split_chunks(&selected, &matched_flags, ocr);

        let mut drafts: Vec<SummaryDraft> = Vec::new();
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            match self.draft_chunk(&topic, chunk).await {
                Ok(Some(draft)) => {
                    self.debug
                        .topic_chunk(chatroom, topic_index, chunk_index, &draft);
                    drafts.push(draft);
                }
                Ok(None) => {
                    warnings.push(format!(
                        "topic {} chunk {} summary unparseable",
                        topic_index + 1,
                        chunk_index + 1
                    ));
                }
                Err(error) => {
                    warnings.push(format!(
                        "topic {} chunk {} summary failed: {}",
                        topic_index + 1,
                        chunk_index + 1,
                        error
                    ));
                }
            }
        }

        let final_draft = self
            .consolidate(&topic, drafts, topic_index, warnings)
            .await;
        self.debug.topic_summary(chatroom, topic_index, &final_draft);

        FinalTopic {
            title: truncate_title(&final_draft.title),
            category: final_draft.category,
            summary: final_draft.summary,
            time_range,
            popularity: 0.0,
            merged: topic,
        }
    }

    /// Pick the topic's messages off the chatroom timeline, adding a
    /// bounded neighbor window when the topic is small. Returns the
    /// selection (renumbered for rendering), a matched/context flag per
    /// entry, and the time range of the matched messages only.
    fn select_sources(
        &self,
        topic: &MergedTopic,
        timeline: &[EnrichedMessage],
    ) -> (
        Vec<EnrichedMessage>,
        Vec<bool>,
        (Option<NaiveDateTime>, Option<NaiveDateTime>),
    ) {
        let matched_positions: Vec<usize> = timeline
            .iter()
            .enumerate()
            .filter(|(_, m)| topic.message_ids.contains(&m.msg_id))
            .map(|(position, _)| position)
            .collect();

        let mut positions: BTreeSet<usize> = matched_positions.iter().copied().collect();
        if matched_positions.len() < SMALL_TOPIC_THRESHOLD && !matched_positions.is_empty() {
            let first = matched_positions[0];
            let last = matched_positions[matched_positions.len() - 1];
            let window = self.options.context_window;
            for position in first.saturating_sub(window)..first {
                positions.insert(position);
            }
            for position in (last + 1)..timeline.len().min(last + 1 + window) {
                positions.insert(position);
            }
        }

        let mut matched_times: Vec<NaiveDateTime> = matched_positions
            .iter()
            .filter_map(|&p| timeline[p].timestamp)
            .collect();
        matched_times.sort();
        let time_range = (matched_times.first().copied(), matched_times.last().copied());

        let mut selected = Vec::with_capacity(positions.len());
        let mut matched_flags = Vec::with_capacity(positions.len());
        for (ordinal, position) in positions.iter().enumerate() {
            let mut message = timeline[*position].clone();
            message.seq_id = ordinal + 1;
            matched_flags.push(topic.message_ids.contains(&message.msg_id));
            selected.push(message);
        }

        (selected, matched_flags, time_range)
    }

    /// Cut the selection into chunks honoring the classification token
    /// budget and the configured per-chunk message target.
    fn split_chunks(
        &self,
        selected: &[EnrichedMessage],
        matched_flags: &[bool],
        ocr: Option<&OcrCache>,
    ) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut lines: Vec<String> = Vec::new();
        let mut matched_count = 0usize;
        let mut tokens = 0usize;

        for (message, &matched) in selected.iter().zip(matched_flags) {
            let line = formatter::render_for_summary(std::slice::from_ref(message), ocr)
                .pop()
                .unwrap_or_default();
            let cost = estimate_tokens(&line);

            let full = !lines.is_empty()
                && (lines.len() >= self.options.chunk_messages
                    || tokens + cost > self.batch_options.max_tokens);
            if full {
                chunks.push(Chunk {
                    lines: std::mem::take(&mut lines),
                    matched_count,
                });
                matched_count = 0;
                tokens = 0;
            }

            tokens += cost;
            lines.push(line);
            if matched {
                matched_count += 1;
            }
        }

        if !lines.is_empty() {
            chunks.push(Chunk {
                lines,
                matched_count,
            });
        }

        chunks
    }

    async fn draft_chunk(
        &self,
        topic: &MergedTopic,
        chunk: &Chunk,
    ) -> AnalyzerResult<Option<SummaryDraft>> {
        let messages = prompts::chunk_summary(&topic.keywords, &chunk.lines);
        let response = self.provider.invoke(&messages).await?;

        let mut parse_warnings = Vec::new();
        let draft = protocol::parse_summary(&response, &mut parse_warnings).map(|mut draft| {
            draft.message_count = chunk.matched_count;
            draft
        });
        for warning in parse_warnings {
            log_warn!(warning = %warning, "Chunk summary parse warning");
        }
        Ok(draft)
    }

    /// Stage 2: one draft is used directly, several are consolidated by
    /// the model, and failures fall back per the error policy.
    async fn consolidate(
        &self,
        topic: &MergedTopic,
        mut drafts: Vec<SummaryDraft>,
        topic_index: usize,
        warnings: &mut Vec<String>,
    ) -> SummaryDraft {
        match drafts.len() {
            0 => fallback_draft(topic),
            1 => drafts.swap_remove(0),
            _ => {
                let messages = prompts::merge_summary(topic, &drafts);
                match self.provider.invoke(&messages).await {
                    Ok(response) => {
                        let mut parse_warnings = Vec::new();
                        if let Some(mut draft) =
                            protocol::parse_summary(&response, &mut parse_warnings)
                        {
                            draft.message_count = topic.message_count;
                            return draft;
                        }
                        warnings.extend(parse_warnings);
                        best_draft(drafts)
                    }
                    Err(error) => {
                        warnings.push(format!(
                            "topic {} summary consolidation failed: {}",
                            topic_index + 1,
                            error
                        ));
                        best_draft(drafts)
                    }
                }
            }
        }
    }
}

/// The draft covering the most matched messages.
fn best_draft(drafts: Vec<SummaryDraft>) -> SummaryDraft {
    drafts
        .into_iter()
        .max_by_key(|d| d.message_count)
        .unwrap_or_default()
}

/// Emitted when every summarization attempt failed.
fn fallback_draft(topic: &MergedTopic) -> SummaryDraft {
    SummaryDraft {
        title: topic.keywords.first().cloned().unwrap_or_default(),
        category: FALLBACK_CATEGORY.to_string(),
        summary: topic.notes.clone(),
        notes: String::new(),
        message_count: topic.message_count,
    }
}

/// Cap a title at the display budget, appending an ellipsis when cut.
fn truncate_title(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= TITLE_CHARS {
        return title.to_string();
    }
    let mut out: String = chars[..TITLE_CHARS - 1].iter().collect();
    out.push('\u{2026}');
    out
}
