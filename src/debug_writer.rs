//! Best-effort debug artifacts for prompt and merge tuning.
//!
//! When a root directory is configured, every batch's exact model input,
//! raw output, and parsed topics land under
//! `{root}/{safe_chatroom_name}/`, along with a merge report and the
//! per-topic summary stages. Writes never abort analysis: I/O errors are
//! logged and swallowed. Without a root, every method is a no-op.
//!
//! One run per debug directory: concurrent runs against the same root and
//! chatroom produce undefined output.

use crate::logging::log_warn;
use crate::merger::ClusterReport;
use crate::topics::{RawTopic, SummaryDraft};

use std::fmt::Write as _;
use std::path::PathBuf;

/// Writer handle threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct DebugWriter {
    root: Option<PathBuf>,
}

/// Map a chatroom identifier to a filesystem-safe directory name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

impl DebugWriter {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Whether artifacts are being written at all.
    pub fn enabled(&self) -> bool {
        self.root.is_some()
    }

    fn write(&self, chatroom: &str, file_name: &str, content: &str) {
        let Some(root) = &self.root else {
            return;
        };
        let dir = root.join(sanitize(chatroom));
        if let Err(error) = std::fs::create_dir_all(&dir) {
            log_warn!(
                path = %dir.display(),
                error = %error,
                "Debug directory creation failed, skipping artifact"
            );
            return;
        }
        let path = dir.join(file_name);
        if let Err(error) = std::fs::write(&path, content) {
            log_warn!(
                path = %path.display(),
                error = %error,
                "Debug artifact write failed"
            );
        }
    }

    /// The exact text sent to the model for one batch.
    pub fn batch_input(&self, chatroom: &str, batch_index: usize, input: &str) {
        self.write(
            chatroom,
            &format!("batch_{:02}_input.txt", batch_index + 1),
            input,
        );
    }

    /// The raw model response for one batch.
    pub fn batch_output(&self, chatroom: &str, batch_index: usize, output: &str) {
        self.write(
            chatroom,
            &format!("batch_{:02}_output.txt", batch_index + 1),
            output,
        );
    }

    /// The parsed topics for one batch, pretty-printed.
    pub fn batch_topics(&self, chatroom: &str, batch_index: usize, topics: &[RawTopic]) {
        let rendered = serde_json::to_string_pretty(topics)
            .unwrap_or_else(|_| format!("{:#?}", topics));
        self.write(
            chatroom,
            &format!("batch_{:02}_topics.txt", batch_index + 1),
            &rendered,
        );
    }

    /// The merge report: sources, similarity scores, and combined keywords
    /// per cluster.
    pub fn merge_report(&self, chatroom: &str, clusters: &[ClusterReport]) {
        if !self.enabled() {
            return;
        }
        let mut out = String::new();
        for cluster in clusters {
            let _ = writeln!(out, "cluster {}", cluster.index);
            let _ = writeln!(out, "  representative: {}", cluster.representative.join(", "));
            for source in &cluster.sources {
                let _ = writeln!(
                    out,
                    "  source (similarity {:.3}): {}",
                    source.similarity,
                    source.keywords.join(", ")
                );
            }
            let _ = writeln!(out, "  combined: {}", cluster.combined.join(", "));
            out.push('\n');
        }
        self.write(chatroom, "merge_report.txt", &out);
    }

    /// One stage-1 chunk draft for a topic.
    pub fn topic_chunk(
        &self,
        chatroom: &str,
        topic_index: usize,
        chunk_index: usize,
        draft: &SummaryDraft,
    ) {
        self.write(
            chatroom,
            &format!("topic_{:02}_chunk_{:02}.txt", topic_index + 1, chunk_index + 1),
            &render_draft(draft),
        );
    }

    /// The final merged summary for a topic.
    pub fn topic_summary(&self, chatroom: &str, topic_index: usize, draft: &SummaryDraft) {
        self.write(
            chatroom,
            &format!("topic_{:02}_summary.txt", topic_index + 1),
            &render_draft(draft),
        );
    }
}

fn render_draft(draft: &SummaryDraft) -> String {
    format!(
        "title: {}\ncategory: {}\nsummary: {}\nnotes: {}\n",
        draft.title, draft.category, draft.summary, draft.notes
    )
}
