//! Cross-batch topic merging.
//!
//! Topics recur across batches because batch boundaries cut through
//! discussions. Fragments are reconciled by keyword similarity alone; time
//! proximity is deliberately not a merge signal, since a topic can resurface
//! hours later.
//!
//! The similarity policy is isolated behind [`keyword_similarity`] so an
//! alternative strategy (e.g. embedding cosine) can replace it without
//! touching the coordinator.

use crate::topics::{MergedTopic, RawTopic};
use std::collections::{BTreeSet, HashMap};

/// Keywords kept on a merged topic.
const KEYWORD_CAP: usize = 12;

/// Canonical form used for keyword comparison: surrounding whitespace and
/// punctuation stripped, lowercased.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword
        .trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .to_lowercase()
}

fn normalized_set(keywords: &[String]) -> BTreeSet<String> {
    keywords
        .iter()
        .map(|k| normalize_keyword(k))
        .filter(|k| !k.is_empty())
        .collect()
}

/// Document frequency of each normalized keyword over the raw topics.
fn document_frequencies(topics: &[RawTopic]) -> HashMap<String, usize> {
    let mut df = HashMap::new();
    for topic in topics {
        for keyword in normalized_set(&topic.keywords) {
            *df.entry(keyword).or_insert(0) += 1;
        }
    }
    df
}

/// Weighted Jaccard similarity over normalized keywords.
///
/// Weights are `1 / ln(2 + df)` so keywords shared by many topics count
/// less than distinctive ones. Without df data every keyword weighs the
/// same and this reduces to plain Jaccard.
pub fn keyword_similarity(
    a: &[String],
    b: &[String],
    df: Option<&HashMap<String, usize>>,
) -> f64 {
    let set_a = normalized_set(a);
    let set_b = normalized_set(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }

    let weight = |keyword: &str| -> f64 {
        match df.and_then(|m| m.get(keyword)) {
            Some(&count) => 1.0 / ((2 + count) as f64).ln(),
            None => 1.0,
        }
    };

    let union_weight: f64 = set_a.union(&set_b).map(|k| weight(k)).sum();
    if union_weight == 0.0 {
        return 0.0;
    }
    let intersection_weight: f64 = set_a.intersection(&set_b).map(|k| weight(k)).sum();

    intersection_weight / union_weight
}

/// One source topic's score against its cluster representative.
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// The source's keywords, as emitted.
    pub keywords: Vec<String>,
    /// Similarity against the representative at attach time.
    pub similarity: f64,
}

/// Tuning record for one cluster, consumed by the debug writer.
#[derive(Debug, Clone)]
pub struct ClusterReport {
    /// Cluster position in creation order.
    pub index: usize,
    /// Keywords of the representative (largest member).
    pub representative: Vec<String>,
    /// Every member, including the representative (similarity 1.0).
    pub sources: Vec<SourceReport>,
    /// Keywords of the combined topic.
    pub combined: Vec<String>,
}

/// Result of a merge pass.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// One merged topic per cluster, in cluster creation order.
    pub topics: Vec<MergedTopic>,
    /// One report entry per cluster.
    pub report: Vec<ClusterReport>,
}

struct Cluster {
    members: Vec<RawTopic>,
    scores: Vec<f64>,
}

impl Cluster {
    /// The member with the largest message count. Members arrive in
    /// descending size order, so that is the first one.
    fn representative(&self) -> &RawTopic {
        &self.members[0]
    }
}

/// Merge raw topics from all batches of one chatroom into clusters.
///
/// Topics are processed by descending `message_count` (input order on
/// ties). Each topic joins the existing cluster whose representative it
/// resembles most, provided that similarity reaches `threshold`;
/// otherwise it founds a new cluster. Equal similarities resolve to the
/// earliest cluster, which keeps the outcome deterministic.
pub fn merge_topics(raw_topics: Vec<RawTopic>, threshold: f64) -> MergeOutcome {
    let df = document_frequencies(&raw_topics);

    let mut ordered = raw_topics;
    ordered.sort_by(|a, b| b.message_count.cmp(&a.message_count));

    let mut clusters: Vec<Cluster> = Vec::new();

    for topic in ordered {
        let mut best: Option<(usize, f64)> = None;
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            let score = keyword_similarity(
                &topic.keywords,
                &cluster.representative().keywords,
                Some(&df),
            );
            let better = match best {
                Some((_, best_score)) => score > best_score,
                None => true,
            };
            if better {
                best = Some((cluster_index, score));
            }
        }

        match best {
            Some((cluster_index, score)) if score >= threshold => {
                clusters[cluster_index].members.push(topic);
                clusters[cluster_index].scores.push(score);
            }
            _ => clusters.push(Cluster {
                members: vec![topic],
                scores: vec![1.0],
            }),
        }
    }

    let mut outcome = MergeOutcome::default();
    for (index, cluster) in clusters.iter().enumerate() {
        let combined = combine(&cluster.members);
        outcome.report.push(ClusterReport {
            index,
            representative: cluster.representative().keywords.clone(),
            sources: cluster
                .members
                .iter()
                .zip(&cluster.scores)
                .map(|(member, &similarity)| SourceReport {
                    keywords: member.keywords.clone(),
                    similarity,
                })
                .collect(),
            combined: combined.keywords.clone(),
        });
        outcome.topics.push(combined);
    }

    outcome
}

/// Reconcile one cluster's members into a merged topic.
fn combine(members: &[RawTopic]) -> MergedTopic {
    let mut merged = MergedTopic {
        source_count: members.len(),
        ..Default::default()
    };

    let mut seen_keywords: BTreeSet<String> = BTreeSet::new();
    let mut seen_notes: BTreeSet<String> = BTreeSet::new();
    let mut notes: Vec<String> = Vec::new();

    for member in members {
        for keyword in &member.keywords {
            let normalized = normalize_keyword(keyword);
            if normalized.is_empty() || !seen_keywords.insert(normalized) {
                continue;
            }
            if merged.keywords.len() < KEYWORD_CAP {
                merged.keywords.push(keyword.clone());
            }
        }

        merged.participants.extend(member.participants.iter().cloned());
        merged.message_ids.extend(member.message_ids.iter().cloned());
        merged.confidence = merged.confidence.max(member.confidence);

        let trimmed = member.notes.trim();
        if !trimmed.is_empty() && seen_notes.insert(trimmed.to_string()) {
            notes.push(trimmed.to_string());
        }
    }

    merged.message_count = merged.message_ids.len();
    merged.notes = notes.join("; ");
    merged
}
