//! Prompt construction for classification and summarization calls.
//!
//! Every call is a single system+user pair. The system message carries the
//! role and the delimited output protocol; the user message carries the
//! batch payload. Prompts are written in Chinese to match the chatroom
//! content the model reads.

use crate::provider::ChatMessage;
use crate::topics::{MergedTopic, SummaryDraft};

/// Coarse categories the summarizer may choose from. The prompt constrains
/// the value; the pipeline does not validate it.
pub const CATEGORIES: [&str; 5] = ["news", "tech", "life", "market", "meta"];

const CLASSIFY_SYSTEM: &str = "\
你是一个群聊话题分析专家。给定一批按时间排序的群聊消息（每行以 #序号 开头），\
请找出其中讨论的全部话题，并严格按照下述定界格式输出，不要输出 JSON。

输出格式：
<<<RESULT_START>>>
<<<TOPIC>>>
keywords: 关键词1, 关键词2
participants:
- 发言人A
- 发言人B
message_indices: 1-3, 7
message_count: 4
confidence: 0.9
notes: 补充说明（可留空）
<<<RESULT_END>>>

规则：
- 每个话题以 <<<TOPIC>>> 开头；keywords 用逗号分隔或每行一个 \"- \" 项。
- message_indices 引用消息行首的 #序号，支持单个数字和闭区间（如 2-5）。
- confidence 是 0 到 1 之间的小数。
- 必须穷举所有话题，哪怕只有一条消息的话题也要列出。";

const SUMMARY_PROTOCOL: &str = "\
输出格式：
<<<RESULT_START>>>
<<<TOPIC>>>
title: 简短标题（不超过40字）
category: news/tech/life/market/meta 之一
summary: 1-3 句话的摘要
notes: 补充说明（可留空）
<<<RESULT_END>>>";

/// Build the classification prompt for one batch.
pub fn classification(
    chatroom: &str,
    date_range: &str,
    lines: &[String],
) -> Vec<ChatMessage> {
    let user = format!(
        "群聊：{}\n时间范围：{}\n\n消息：\n{}\n\n请穷举上述消息中的所有讨论话题，并按协议输出。",
        chatroom,
        date_range,
        lines.join("\n"),
    );
    vec![ChatMessage::system(CLASSIFY_SYSTEM), ChatMessage::user(user)]
}

/// Build the stage-1 prompt summarizing one chunk of a topic's messages.
pub fn chunk_summary(keywords: &[String], lines: &[String]) -> Vec<ChatMessage> {
    let system = format!(
        "你是一个群聊话题总结专家。请为给定话题的一段消息生成标题、分类和摘要。\n\n{}",
        SUMMARY_PROTOCOL,
    );
    let user = format!(
        "话题关键词：{}\n\n消息：\n{}\n\n请按协议输出这段讨论的标题、分类和摘要。",
        keywords.join(", "),
        lines.join("\n"),
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Build the stage-2 prompt consolidating several chunk drafts.
pub fn merge_summary(topic: &MergedTopic, drafts: &[SummaryDraft]) -> Vec<ChatMessage> {
    let system = format!(
        "你是一个群聊话题总结专家。同一个话题被分段总结成了多份草稿，\
请把它们合并成一份最终的标题、分类和摘要。\n\n{}",
        SUMMARY_PROTOCOL,
    );

    let mut rendered = String::new();
    for (ordinal, draft) in drafts.iter().enumerate() {
        rendered.push_str(&format!(
            "草稿 {}：\ntitle: {}\ncategory: {}\nsummary: {}\nnotes: {}\n\n",
            ordinal + 1,
            draft.title,
            draft.category,
            draft.summary,
            draft.notes,
        ));
    }

    let user = format!(
        "话题关键词：{}\n共 {} 条消息。\n\n{}请合并以上草稿，按协议输出唯一一份结果。",
        topic.keywords.join(", "),
        topic.message_count,
        rendered,
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
