//! Message enrichment and line rendering.
//!
//! App messages (`msg_type == 49`) wrap their payload in XML; this module
//! pulls out the few nodes the pipeline cares about (`appmsg/type`, the
//! quoted `refermsg`, share-card titles), derives the filter flag for
//! content with no topical value, and renders one-line textual
//! representations for the model.
//!
//! Malformed XML is never an error: the payload just renders as plain text.

use crate::logging::log_trace;
use crate::records::{EnrichedMessage, MessageRecord, MSG_TYPE_APP};
use crate::store::OcrCache;
use crate::timeutil;

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

/// App-message subtypes carrying no topical value.
const FILTERED_APPMSG_TYPES: [i64; 4] = [3, 47, 51, 124];
/// App-message subtypes rendered as quote replies.
const QUOTE_APPMSG_TYPES: [i64; 2] = [49, 57];
/// App-message subtypes rendered as share cards.
const SHARE_APPMSG_TYPES: [i64; 2] = [4, 5];

/// Longest slice of quoted content shown inline.
const QUOTE_SNIPPET_CHARS: usize = 30;

/// Image payloads eligible for OCR injection.
static IMG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<img[\s/>]").unwrap_or_else(|_| Regex::new("$^").unwrap()));

/// Everything worth knowing from one XML payload.
#[derive(Debug, Default)]
struct XmlFacts {
    appmsg_type: Option<i64>,
    appmsg_title: Option<String>,
    refer_displayname: Option<String>,
    refer_content: Option<String>,
    has_emoji: bool,
    has_voice: bool,
    has_sysmsg: bool,
    has_last_message_op: bool,
}

/// Walk the payload with a streaming reader, collecting the nodes of
/// interest. Returns `None` when the payload is not usable XML.
fn scan_xml(content: &str) -> Option<XmlFacts> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with('<') {
        return None;
    }

    let mut reader = Reader::from_str(trimmed);

    let mut facts = XmlFacts::default();
    let mut path: Vec<String> = Vec::new();
    let mut saw_any_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                note_element(&mut facts, &name);
                saw_any_element = true;
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                note_element(&mut facts, &name);
                saw_any_element = true;
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => {
                if let Ok(text) = e.unescape() {
                    note_text(&mut facts, &path, text.as_ref());
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                note_text(&mut facts, &path, &text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                // Truncated or otherwise broken payload: fall back to
                // whatever was collected so far, or to plain text.
                log_trace!(error = %err, "XML payload unparseable, treating as plain text");
                if !saw_any_element {
                    return None;
                }
                break;
            }
        }
    }

    saw_any_element.then_some(facts)
}

fn note_element(facts: &mut XmlFacts, name: &str) {
    match name {
        "emoji" => facts.has_emoji = true,
        "voicemsg" => facts.has_voice = true,
        "sysmsg" => facts.has_sysmsg = true,
        _ => {}
    }
}

fn note_text(facts: &mut XmlFacts, path: &[String], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match path_suffix(path) {
        ("appmsg", "type") => {
            if facts.appmsg_type.is_none() {
                facts.appmsg_type = text.parse().ok();
            }
        }
        ("appmsg", "title") => {
            if facts.appmsg_title.is_none() {
                facts.appmsg_title = Some(text.to_string());
            }
        }
        ("refermsg", "displayname") => {
            facts.refer_displayname = Some(text.to_string());
        }
        ("refermsg", "content") => {
            facts.refer_content = Some(text.to_string());
        }
        ("op", "name") => {
            if text == "lastMessage" {
                facts.has_last_message_op = true;
            }
        }
        _ => {}
    }
}

/// The last two path components, for parent/leaf matching.
fn path_suffix(path: &[String]) -> (&str, &str) {
    match path {
        [.., parent, leaf] => (parent.as_str(), leaf.as_str()),
        [leaf] => ("", leaf.as_str()),
        [] => ("", ""),
    }
}

/// Enrich a store row into the pipeline's working form.
///
/// Synthesizes a `msg_id` when the row has none, parses the timestamp, and
/// derives the app-message fields and filter flag from the XML payload.
pub fn enrich(record: MessageRecord) -> EnrichedMessage {
    let facts = scan_xml(&record.content).unwrap_or_default();

    let appmsg_type = facts.appmsg_type;
    let has_refer = facts.refer_displayname.is_some() || facts.refer_content.is_some();

    let should_filter = facts.has_emoji
        || facts.has_voice
        || facts.has_sysmsg
        || facts.has_last_message_op
        || appmsg_type.is_some_and(|t| FILTERED_APPMSG_TYPES.contains(&t))
        // Lightweight reaction replies: a type-1 appmsg quoting another
        // message is just an acknowledgement.
        || (appmsg_type == Some(1) && has_refer);

    let timestamp = record.timestamp();

    EnrichedMessage {
        msg_id: record
            .msg_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        timestamp,
        chatroom: record.chatroom,
        chatroom_sender: record.chatroom_sender,
        from_username: record.from_username,
        content: record.content,
        msg_type: record.msg_type,
        appmsg_type,
        refermsg_displayname: facts.refer_displayname,
        refermsg_content: facts.refer_content,
        appmsg_title: facts.appmsg_title,
        should_filter,
        seq_id: 0,
    }
}

/// Whether this message is an image payload eligible for OCR injection.
fn is_image(message: &EnrichedMessage) -> bool {
    message.msg_type == 3 || IMG_PATTERN.is_match(&message.content)
}

fn snippet(text: &str) -> String {
    let mut out: String = text.chars().take(QUOTE_SNIPPET_CHARS).collect();
    if text.chars().count() > QUOTE_SNIPPET_CHARS {
        out.push('\u{2026}');
    }
    out
}

/// The textual body of a rendered line.
///
/// Stable for a given enriched message and OCR cache: rendering twice
/// produces identical text.
pub fn display_text(message: &EnrichedMessage, ocr: Option<&OcrCache>) -> String {
    if is_image(message) {
        return match ocr.and_then(|cache| cache.get(&message.msg_id)) {
            Some(text) => format!("[图片: {}]", text),
            None => "[图片]".to_string(),
        };
    }

    if message.msg_type == MSG_TYPE_APP {
        if let Some(appmsg_type) = message.appmsg_type {
            if QUOTE_APPMSG_TYPES.contains(&appmsg_type) {
                let name = message.refermsg_displayname.as_deref().unwrap_or("");
                let quoted = message.refermsg_content.as_deref().unwrap_or("");
                let reply = message.appmsg_title.as_deref().unwrap_or("");
                return format!("[引用 @{}: {}] {}", name, snippet(quoted), reply);
            }
            if SHARE_APPMSG_TYPES.contains(&appmsg_type) {
                let title = message.appmsg_title.as_deref().unwrap_or("");
                return format!("[分享] {}", title);
            }
        }
        // Unrecognized app message: prefer the human-readable title over
        // raw XML when one exists.
        if let Some(title) = message.appmsg_title.as_deref() {
            return title.to_string();
        }
    }

    message.content.clone()
}

/// Render one line: `#{seq_id} [{HH:MM:SS}] {sender}: {text}`.
pub fn render_line(message: &EnrichedMessage, ocr: Option<&OcrCache>) -> String {
    let time = message
        .timestamp
        .map(timeutil::format_time)
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "#{} [{}] {}: {}",
        message.seq_id,
        time,
        message.sender(),
        display_text(message, ocr)
    )
}

/// Render the classification input for a batch: one line per message,
/// filtered messages already removed upstream.
pub fn render_batch(messages: &[EnrichedMessage], ocr: Option<&OcrCache>) -> Vec<String> {
    messages.iter().map(|m| render_line(m, ocr)).collect()
}

/// Render lines for summarization. More permissive than the
/// classification mode: filtered messages are kept for situational
/// awareness, marked so the model does not treat them as content.
pub fn render_for_summary(messages: &[EnrichedMessage], ocr: Option<&OcrCache>) -> Vec<String> {
    messages
        .iter()
        .map(|m| {
            let line = render_line(m, ocr);
            if m.should_filter {
                format!("{} (非正文)", line)
            } else {
                line
            }
        })
        .collect()
}
