// Shared test utilities: record builders, canned providers, and
// ready-made wire-format responses.

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::formatter;
use crate::provider::{ChatMessage, LlmProvider};
use crate::records::{EnrichedMessage, MessageRecord};
use crate::topics::RawTopic;

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeSet, VecDeque};
use tokio::sync::Mutex;

/// Build a plain-text store row.
pub fn record(
    msg_id: &str,
    epoch: i64,
    chatroom: &str,
    sender: &str,
    content: &str,
) -> MessageRecord {
    MessageRecord {
        msg_id: Some(msg_id.to_string()),
        create_time: json!(epoch),
        chatroom: chatroom.to_string(),
        chatroom_sender: sender.to_string(),
        from_username: format!("wxid_{}", sender),
        content: content.to_string(),
        msg_type: 1,
        is_chatroom_msg: true,
    }
}

/// Build an enriched plain-text message directly.
pub fn enriched(msg_id: &str, epoch: i64, sender: &str, content: &str) -> EnrichedMessage {
    formatter::enrich(record(msg_id, epoch, "room1", sender, content))
}

/// Build a raw topic from keywords and pre-resolved message IDs.
pub fn raw_topic(keywords: &[&str], message_ids: &[&str], confidence: f64) -> RawTopic {
    let ids: BTreeSet<String> = message_ids.iter().map(|s| s.to_string()).collect();
    RawTopic {
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        participants: BTreeSet::new(),
        message_indices: BTreeSet::new(),
        message_count: ids.len(),
        confidence,
        notes: String::new(),
        message_ids: ids,
    }
}

/// A quote-reply payload (appmsg type 57 with a refermsg).
pub fn quote_reply_xml(displayname: &str, quoted: &str, reply: &str) -> String {
    format!(
        "<msg><appmsg><title>{}</title><type>57</type>\
         <refermsg><displayname>{}</displayname><content>{}</content></refermsg>\
         </appmsg></msg>",
        reply, displayname, quoted
    )
}

/// A share-card payload (appmsg type 5).
pub fn share_card_xml(title: &str) -> String {
    format!(
        "<msg><appmsg><title>{}</title><type>5</type></appmsg></msg>",
        title
    )
}

/// A provider that replays a script of responses in order.
///
/// Invocations past the end of the script return an empty delimited block,
/// which parses to zero topics / no draft.
pub struct CannedProvider {
    script: Mutex<VecDeque<AnalyzerResult<String>>>,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl CannedProvider {
    pub fn new(script: Vec<AnalyzerResult<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for CannedProvider {
    async fn invoke(&self, messages: &[ChatMessage]) -> AnalyzerResult<String> {
        self.calls.lock().await.push(messages.to_vec());
        match self.script.lock().await.pop_front() {
            Some(result) => result,
            None => Ok("<<<RESULT_START>>>\n<<<RESULT_END>>>".to_string()),
        }
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

/// Shorthand for a scripted transient failure.
pub fn canned_failure() -> AnalyzerResult<String> {
    Err(AnalyzerError::UpstreamError { status: 503 })
}

/// A classification response with one topic.
pub fn one_topic_response(keywords: &str, indices: &str, confidence: f64) -> String {
    format!(
        "<<<RESULT_START>>>\n<<<TOPIC>>>\nkeywords: {}\nmessage_indices: {}\nconfidence: {}\n<<<RESULT_END>>>",
        keywords, indices, confidence
    )
}

/// A summary response with the given title.
pub fn summary_response(title: &str, category: &str, summary: &str) -> String {
    format!(
        "<<<RESULT_START>>>\n<<<TOPIC>>>\ntitle: {}\ncategory: {}\nsummary: {}\nnotes:\n<<<RESULT_END>>>",
        title, category, summary
    )
}
