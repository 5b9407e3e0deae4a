//! Markdown report rendering.
//!
//! The generation timestamp is a parameter rather than a clock read so
//! identical analysis results render to byte-identical reports.

use crate::timeutil;
use crate::topics::FinalTopic;

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Write as _;

/// One chatroom's slice of the report.
#[derive(Debug, Clone, Default)]
pub struct ChatroomSection {
    /// Chatroom identifier.
    pub chatroom: String,
    /// Messages surviving the topical filter for the day.
    pub message_total: usize,
    /// Ranked topics, best first, already cut to the configured top N.
    pub topics: Vec<FinalTopic>,
}

/// Keep a value usable inside a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "/")
}

/// Render the full report.
pub fn render(
    date: NaiveDate,
    generated_at: DateTime<Utc>,
    sections: &[ChatroomSection],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Chatroom Analysis \u{2014} {}", date.format("%Y-%m-%d"));
    let _ = writeln!(
        out,
        "Generated at: {}",
        generated_at.format("%Y-%m-%dT%H:%M:%SZ")
    );

    for section in sections {
        let _ = writeln!(out, "\n## Chatroom {}", section.chatroom);
        let _ = writeln!(out, "- Messages: {}", section.message_total);
        let _ = writeln!(out, "- Topics: {}", section.topics.len());

        if section.topics.is_empty() {
            continue;
        }

        let _ = writeln!(
            out,
            "\n| # | Title | Category | Participants | Msgs | Confidence | Time Range | Summary |"
        );
        let _ = writeln!(
            out,
            "|---|-------|----------|--------------|------|------------|-----------|---------|"
        );

        for (rank, topic) in section.topics.iter().enumerate() {
            let participants: Vec<&str> = topic
                .merged
                .participants
                .iter()
                .map(String::as_str)
                .collect();
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {:.2} | {} | {} |",
                rank + 1,
                cell(&topic.title),
                cell(&topic.category),
                cell(&participants.join(", ")),
                topic.merged.message_count,
                topic.merged.confidence,
                timeutil::build_time_range(topic.time_range.0, topic.time_range.1),
                cell(&topic.summary),
            );
        }
    }

    out
}
