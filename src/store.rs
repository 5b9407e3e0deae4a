//! Collaborator seams: the message store and the OCR cache.
//!
//! The columnar store itself lives outside this crate; the analyzer only
//! needs a pure query function that returns a day's chatroom rows as
//! dict-shaped records. [`MessageStore`] is that seam, with
//! [`InMemoryStore`] shipping for tests and embedding callers that already
//! hold the rows.

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::logging::log_debug;
use crate::records::MessageRecord;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;

/// Read-only access to one day of chatroom messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Load all chatroom rows for `date`, optionally restricted to the
    /// given chatroom identifiers. Rows where `is_chatroom_msg` is unset
    /// must not be returned.
    async fn load_day(
        &self,
        date: NaiveDate,
        chatrooms: Option<&[String]>,
    ) -> AnalyzerResult<Vec<MessageRecord>>;
}

/// A store over rows already in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<MessageRecord>,
}

impl InMemoryStore {
    pub fn new(records: Vec<MessageRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn load_day(
        &self,
        date: NaiveDate,
        chatrooms: Option<&[String]>,
    ) -> AnalyzerResult<Vec<MessageRecord>> {
        let rows: Vec<MessageRecord> = self
            .records
            .iter()
            .filter(|r| r.is_chatroom_msg)
            .filter(|r| r.timestamp().map(|ts| ts.date()) == Some(date))
            .filter(|r| match chatrooms {
                Some(wanted) => wanted.iter().any(|c| c == &r.chatroom),
                None => true,
            })
            .cloned()
            .collect();

        log_debug!(
            date = %date,
            row_count = rows.len(),
            "Loaded day from in-memory store"
        );

        Ok(rows)
    }
}

/// Recognized text for image messages, keyed by `msg_id`.
///
/// Missing keys are non-fatal; the formatter renders a bare image marker.
#[derive(Debug, Clone, Default)]
pub struct OcrCache {
    entries: HashMap<String, String>,
}

impl OcrCache {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load from a flat key/value file: one `msg_id<TAB>text` pair per
    /// line. Blank lines and lines without a tab are skipped.
    pub fn from_file(path: &Path) -> AnalyzerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AnalyzerError::store_error(format!("OCR cache {} unreadable: {}", path.display(), e))
        })?;

        let entries = raw
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once('\t')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.trim().to_string()))
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn get(&self, msg_id: &str) -> Option<&String> {
        self.entries.get(msg_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
