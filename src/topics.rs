//! Topic value objects produced along the pipeline.
//!
//! `RawTopic` is one model-emitted topic for one batch. `MergedTopic` is a
//! cross-batch cluster of raw topics. `FinalTopic` adds the summarization
//! output and the popularity score. All are plain values; nothing is
//! mutated after a component hands its output downstream.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeSet;

/// One topic fragment as classified by the model for a single batch.
///
/// `participants`, `message_indices` and `message_ids` are ordered sets so
/// every serialization of a topic is deterministic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawTopic {
    /// Short keyword strings, in the order the model emitted them. The
    /// merge key.
    pub keywords: Vec<String>,
    /// Sender identifiers.
    pub participants: BTreeSet<String>,
    /// Batch-local sequence IDs (1..=N).
    pub message_indices: BTreeSet<usize>,
    /// Stable message IDs resolved from the indices.
    pub message_ids: BTreeSet<String>,
    /// Number of referenced messages. Always `message_ids.len()` once
    /// indices are resolved; the resolved set wins over the model's claim.
    pub message_count: usize,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    /// Free-form notes.
    pub notes: String,
}

/// A cluster of raw topics combined across batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedTopic {
    /// Union of source keyword lists, deduplicated by normalized form,
    /// first-occurrence order, capped at 12.
    pub keywords: Vec<String>,
    /// Union of source participants.
    pub participants: BTreeSet<String>,
    /// Union of source message IDs.
    pub message_ids: BTreeSet<String>,
    /// `message_ids.len()`.
    pub message_count: usize,
    /// Maximum source confidence.
    pub confidence: f64,
    /// Non-empty source notes joined by "; ", deduplicated.
    pub notes: String,
    /// Number of raw topics merged into this cluster.
    pub source_count: usize,
}

/// Output of one summarization call (stage 1 chunk or stage 2 merge).
#[derive(Debug, Clone, Default)]
pub struct SummaryDraft {
    /// Short headline.
    pub title: String,
    /// Coarse category label.
    pub category: String,
    /// 1-3 sentence abstract.
    pub summary: String,
    /// Free-form notes.
    pub notes: String,
    /// Messages covered by the chunk this draft came from. Used to pick
    /// the best draft when stage 2 fails.
    pub message_count: usize,
}

/// A merged topic with its summary and ranking attributes filled in.
#[derive(Debug, Clone, Serialize)]
pub struct FinalTopic {
    /// The merged cluster this topic came from.
    #[serde(flatten)]
    pub merged: MergedTopic,
    /// Short headline, at most 40 characters.
    pub title: String,
    /// Coarse category label.
    pub category: String,
    /// 1-3 sentence abstract.
    pub summary: String,
    /// Inclusive span of the referenced messages (not context).
    pub time_range: (Option<NaiveDateTime>, Option<NaiveDateTime>),
    /// Popularity heuristic; zero iff there are no participants.
    pub popularity: f64,
}
