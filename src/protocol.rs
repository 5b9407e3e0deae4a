//! The delimited wire format spoken with the model.
//!
//! JSON proved too fragile for long classification outputs, so prompts ask
//! for a marker-delimited block instead:
//!
//! ```text
//! <<<RESULT_START>>>
//! <<<TOPIC>>>
//! keywords: a, b
//! participants:
//! - alice
//! message_indices: 1-3, 7
//! message_count: 4
//! confidence: 0.9
//! notes:
//! <<<RESULT_END>>>
//! ```
//!
//! Parsing is strictly best-effort and never fails: missing delimiters fall
//! back to a `<<<TOPIC>>>` scan, unknown keys and malformed values degrade
//! to warnings, and an unusable response simply yields zero topics. The
//! same grammar carries summary responses (`title`/`category`/`summary`/
//! `notes` scalar lines).

use crate::logging::log_warn;
use crate::topics::{RawTopic, SummaryDraft};
use std::collections::{BTreeSet, HashMap};

/// Opens the machine-readable block.
pub const RESULT_START: &str = "<<<RESULT_START>>>";
/// Closes the machine-readable block.
pub const RESULT_END: &str = "<<<RESULT_END>>>";
/// Starts one topic inside the block.
pub const TOPIC_MARK: &str = "<<<TOPIC>>>";

/// Outcome of parsing a classification response.
#[derive(Debug, Default)]
pub struct ParsedTopics {
    /// Topics recovered from the response, possibly none.
    pub topics: Vec<RawTopic>,
    /// Everything that went wrong along the way.
    pub warnings: Vec<String>,
}

/// Extract the payload between the result delimiters.
///
/// Falls back to the text after the first `<<<TOPIC>>>` marker when either
/// delimiter is missing; records a warning in that case.
fn extract_block<'a>(response: &'a str, warnings: &mut Vec<String>) -> Option<&'a str> {
    let start = response.find(RESULT_START);
    let end = response.rfind(RESULT_END);

    match (start, end) {
        (Some(s), Some(e)) if s + RESULT_START.len() <= e => {
            Some(&response[s + RESULT_START.len()..e])
        }
        _ => {
            // Best-effort recovery: the model forgot a delimiter but may
            // still have emitted topic blocks.
            if let Some(t) = response.find(TOPIC_MARK) {
                warnings.push("result delimiters missing, recovered from topic markers".into());
                let tail = &response[t..];
                let tail = match tail.rfind(RESULT_END) {
                    Some(e) => &tail[..e],
                    None => tail,
                };
                Some(tail)
            } else {
                warnings.push("no result delimiters or topic markers in response".into());
                None
            }
        }
    }
}

/// Parse a classification response into raw topics.
///
/// `batch_len` bounds the acceptable message indices; out-of-range entries
/// are dropped with a warning. Topics whose index set ends up empty are
/// discarded. Never returns an error.
pub fn parse_topics(response: &str, batch_len: usize) -> ParsedTopics {
    let mut parsed = ParsedTopics::default();

    let Some(block) = extract_block(response, &mut parsed.warnings) else {
        log_warn!(
            response_length = response.len(),
            "Classification response had no parseable block"
        );
        return parsed;
    };

    for segment in block.split(TOPIC_MARK).skip(1) {
        match parse_topic_segment(segment, batch_len, &mut parsed.warnings) {
            Some(topic) => parsed.topics.push(topic),
            None => parsed
                .warnings
                .push("discarded topic with no usable message indices".into()),
        }
    }

    parsed
}

/// Field accumulator for one `<<<TOPIC>>>` segment.
fn parse_topic_segment(
    segment: &str,
    batch_len: usize,
    warnings: &mut Vec<String>,
) -> Option<RawTopic> {
    let mut topic = RawTopic {
        confidence: 0.5,
        ..Default::default()
    };
    let mut claimed_count: Option<usize> = None;
    // Key of the list-field currently collecting "- " lines.
    let mut open_list: Option<String> = None;

    for raw_line in segment.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(item) = line.strip_prefix("- ") {
            let value = item.trim();
            match open_list.as_deref() {
                Some("keywords") => push_keyword(&mut topic.keywords, value),
                Some("participants") => {
                    if !value.is_empty() {
                        topic.participants.insert(value.to_string());
                    }
                }
                Some("message_indices") => {
                    let (indices, mut w) = parse_indices(value, batch_len);
                    topic.message_indices.extend(indices);
                    warnings.append(&mut w);
                }
                Some(other) => {
                    warnings.push(format!("list item under unknown key {:?} ignored", other));
                }
                None => warnings.push("stray list item outside any field ignored".into()),
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        open_list = None;

        match key.as_str() {
            "keywords" => {
                if value.is_empty() {
                    open_list = Some(key);
                } else {
                    for part in value.split(',') {
                        push_keyword(&mut topic.keywords, part.trim());
                    }
                }
            }
            "participants" => {
                // Always a list-field, but tolerate inline just in case.
                if value.is_empty() {
                    open_list = Some(key);
                } else {
                    for part in value.split(',') {
                        let part = part.trim();
                        if !part.is_empty() {
                            topic.participants.insert(part.to_string());
                        }
                    }
                }
            }
            "message_indices" => {
                if value.is_empty() {
                    open_list = Some(key);
                } else {
                    let (indices, mut w) = parse_indices(value, batch_len);
                    topic.message_indices.extend(indices);
                    warnings.append(&mut w);
                }
            }
            "message_count" => match value.parse::<usize>() {
                Ok(count) => claimed_count = Some(count),
                Err(_) => warnings.push(format!("message_count not an integer: {:?}", value)),
            },
            "confidence" => match value.parse::<f64>() {
                Ok(c) if c.is_finite() => topic.confidence = c.clamp(0.0, 1.0),
                _ => {
                    warnings.push(format!("confidence malformed: {:?}, defaulting to 0.5", value));
                    topic.confidence = 0.5;
                }
            },
            "notes" => topic.notes = value.to_string(),
            other => warnings.push(format!("unknown key {:?} ignored", other)),
        }
    }

    if topic.message_indices.is_empty() {
        return None;
    }

    topic.message_count = claimed_count.unwrap_or(topic.message_indices.len());
    Some(topic)
}

fn push_keyword(keywords: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        keywords.push(value.to_string());
    }
}

/// Parse a comma-separated index expression over `1..=batch_len`.
///
/// Tokens may be single integers (`"5"`) or inclusive ranges (`"1-5"`).
/// Out-of-range indices are dropped with a warning; duplicates collapse.
pub fn parse_indices(text: &str, batch_len: usize) -> (BTreeSet<usize>, Vec<String>) {
    let mut indices = BTreeSet::new();
    let mut warnings = Vec::new();

    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let (lo, hi) = match token.split_once('-') {
            Some((a, b)) => match (a.trim().parse::<usize>(), b.trim().parse::<usize>()) {
                (Ok(lo), Ok(hi)) if lo <= hi => (lo, hi),
                _ => {
                    warnings.push(format!("index token malformed: {:?}", token));
                    continue;
                }
            },
            None => match token.parse::<usize>() {
                Ok(v) => (v, v),
                Err(_) => {
                    warnings.push(format!("index token malformed: {:?}", token));
                    continue;
                }
            },
        };

        if lo == 0 || hi > batch_len {
            warnings.push(format!(
                "index token {:?} clipped to 1..={}",
                token, batch_len
            ));
        }
        for index in lo.max(1)..=hi.min(batch_len) {
            indices.insert(index);
        }
    }

    (indices, warnings)
}

/// Render an index set in range-compressed form (`"1-3, 7"`).
///
/// The inverse of [`parse_indices`] for any in-range set.
pub fn format_indices(indices: &BTreeSet<usize>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run: Option<(usize, usize)> = None;

    for &index in indices {
        run = match run {
            Some((lo, hi)) if index == hi + 1 => Some((lo, index)),
            Some((lo, hi)) => {
                parts.push(format_run(lo, hi));
                Some((index, index))
            }
            None => Some((index, index)),
        };
    }
    if let Some((lo, hi)) = run {
        parts.push(format_run(lo, hi));
    }

    parts.join(", ")
}

fn format_run(lo: usize, hi: usize) -> String {
    if lo == hi {
        lo.to_string()
    } else {
        format!("{}-{}", lo, hi)
    }
}

/// Translate each topic's indices into message IDs via the batch's
/// `seq_id -> msg_id` table.
///
/// Unresolved indices are dropped with a warning, `message_count` is reset
/// to the resolved set size, and topics left without any ID are removed.
pub fn resolve_message_ids(
    topics: Vec<RawTopic>,
    seq_to_msg: &HashMap<usize, String>,
    warnings: &mut Vec<String>,
) -> Vec<RawTopic> {
    topics
        .into_iter()
        .filter_map(|mut topic| {
            for index in &topic.message_indices {
                match seq_to_msg.get(index) {
                    Some(id) => {
                        topic.message_ids.insert(id.clone());
                    }
                    None => warnings.push(format!("sequence id {} has no message", index)),
                }
            }
            if topic.message_count != topic.message_ids.len() {
                topic.message_count = topic.message_ids.len();
            }
            if topic.message_ids.is_empty() {
                warnings.push("topic resolved to zero messages, discarded".into());
                return None;
            }
            Some(topic)
        })
        .collect()
}

/// Parse a summarization response into a draft.
///
/// The block carries scalar `title`/`category`/`summary`/`notes` lines,
/// optionally behind a `<<<TOPIC>>>` marker. Returns `None` (with a
/// warning) when no field at all can be recovered.
pub fn parse_summary(response: &str, warnings: &mut Vec<String>) -> Option<SummaryDraft> {
    let block = extract_block(response, warnings).unwrap_or(response);

    let mut draft = SummaryDraft::default();
    let mut any = false;

    for raw_line in block.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line == TOPIC_MARK {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "title" => {
                draft.title = value.to_string();
                any = true;
            }
            "category" => {
                draft.category = value.to_string();
                any = true;
            }
            "summary" => {
                draft.summary = value.to_string();
                any = true;
            }
            "notes" => draft.notes = value.to_string(),
            _ => {}
        }
    }

    if any {
        Some(draft)
    } else {
        warnings.push("summary response had no recognizable fields".into());
        None
    }
}
