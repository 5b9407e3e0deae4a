//! Input records and their enriched in-memory form.
//!
//! [`MessageRecord`] mirrors a dict-shaped row from the columnar store,
//! tolerating the field-type drift the ingest side produces (`create_time`
//! as int, float, or string; `is_chatroom_msg` as bool or 0/1).
//! [`EnrichedMessage`] is the pipeline's working value: a record plus the
//! derived fields the formatter fills in. Entities are created per run and
//! never updated after handoff to the next component.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::timeutil;

/// App/refer payloads arrive with this message type.
pub const MSG_TYPE_APP: i64 = 49;

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    // Ingest writes booleans, the columnar rewrite writes 0/1.
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// One row from the columnar store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Stable message ID; synthesized during enrichment when absent.
    #[serde(default)]
    pub msg_id: Option<String>,
    /// Creation timestamp in whatever shape ingest produced.
    #[serde(default)]
    pub create_time: Value,
    /// Chatroom identifier.
    #[serde(default)]
    pub chatroom: String,
    /// In-room sender identifier; may be empty.
    #[serde(default)]
    pub chatroom_sender: String,
    /// Fallback sender.
    #[serde(default)]
    pub from_username: String,
    /// Message body; may contain an XML payload.
    #[serde(default)]
    pub content: String,
    /// Raw message type; 49 indicates app/refer messages.
    #[serde(default)]
    pub msg_type: i64,
    /// Whether the row belongs to a chatroom conversation.
    #[serde(default, deserialize_with = "de_flag")]
    pub is_chatroom_msg: bool,
}

impl MessageRecord {
    /// Parsed creation time, when interpretable.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        timeutil::to_datetime(&self.create_time)
    }
}

/// A record plus the fields derived during enrichment.
///
/// Created by [`crate::formatter::enrich`]; downstream components treat it
/// as immutable except for the batch-local sequence ID, which the batcher
/// assigns.
#[derive(Debug, Clone)]
pub struct EnrichedMessage {
    /// Stable message ID, always present after enrichment.
    pub msg_id: String,
    /// Parsed creation time.
    pub timestamp: Option<NaiveDateTime>,
    /// Chatroom identifier.
    pub chatroom: String,
    /// In-room sender identifier; may be empty.
    pub chatroom_sender: String,
    /// Fallback sender.
    pub from_username: String,
    /// Message body, original form.
    pub content: String,
    /// Raw message type.
    pub msg_type: i64,
    /// `<appmsg><type>` extracted from the XML payload.
    pub appmsg_type: Option<i64>,
    /// Display name of the quoted message's author.
    pub refermsg_displayname: Option<String>,
    /// Body of the quoted message.
    pub refermsg_content: Option<String>,
    /// `<appmsg><title>`: share-card title, or the reply text of a
    /// quote-reply.
    pub appmsg_title: Option<String>,
    /// Whether this record carries no topical value and must be dropped
    /// before classification.
    pub should_filter: bool,
    /// Dense 1-based index within the current batch. Zero until the
    /// batcher assigns it; stable only within the batch.
    pub seq_id: usize,
}

impl EnrichedMessage {
    /// The sender shown in rendered lines: in-room identity when present,
    /// otherwise the sending account.
    pub fn sender(&self) -> &str {
        if self.chatroom_sender.is_empty() {
            &self.from_username
        } else {
            &self.chatroom_sender
        }
    }
}
