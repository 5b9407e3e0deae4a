//! The pipeline coordinator.
//!
//! Loads a day of chatroom rows, runs enrichment, batching, and per-batch
//! classification, merges the resulting topic fragments, summarizes each
//! cluster, ranks by popularity, and renders the Markdown report.
//!
//! Chatrooms are processed sequentially and batches within a chatroom
//! sequentially; a failed batch or an unparseable response costs only that
//! batch's topics, never the run.

use crate::batcher::{self, Batch};
use crate::config::AnalyzerConfig;
use crate::debug_writer::DebugWriter;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::formatter;
use crate::logging::{log_info, log_warn};
use crate::merger;
use crate::prompts;
use crate::protocol;
use crate::provider::LlmProvider;
use crate::providers::OpenAiCompatibleProvider;
use crate::records::EnrichedMessage;
use crate::report::{self, ChatroomSection};
use crate::store::{MessageStore, OcrCache};
use crate::summarizer::Summarizer;
use crate::timeutil;
use crate::topics::{FinalTopic, RawTopic};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Saturation knee: message volume beyond this many per participant is
/// discounted.
const POPULARITY_KNEE: f64 = 6.0;

/// One structured warning emitted during a run.
///
/// The CLI prints these to standard error, one record per warning.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    /// Chatroom the warning belongs to.
    pub chatroom: String,
    /// Batch the warning belongs to, when batch-scoped.
    pub batch_index: Option<usize>,
    /// What went wrong.
    pub cause: String,
}

/// Everything a run produces.
#[derive(Debug)]
pub struct AnalysisReport {
    /// The analyzed date.
    pub date: NaiveDate,
    /// Rendered Markdown (§6.4 shape). Writing it to disk is the CLI's job.
    pub markdown: String,
    /// Per-chatroom results backing the Markdown.
    pub sections: Vec<ChatroomSection>,
    /// Structured warnings collected along the way.
    pub warnings: Vec<Warning>,
}

/// Popularity heuristic over unique participants and message count.
///
/// `ln(1+U)^1.2 * ln(1+M)^0.8 * (1 + max(0, M/U - 6))^-0.4`, and zero when
/// there are no participants. The exponents and the knee are tuned
/// empirically and part of the ranking contract.
pub fn popularity(unique_participants: usize, message_count: usize) -> f64 {
    if unique_participants == 0 {
        return 0.0;
    }
    let u = unique_participants as f64;
    let m = message_count as f64;

    let reach = (1.0 + u).ln().powf(1.2);
    let volume = (1.0 + m).ln().powf(0.8);
    let saturation = (1.0 + (m / u - POPULARITY_KNEE).max(0.0)).powf(-0.4);

    reach * volume * saturation
}

/// The analysis pipeline, configured once per run.
pub struct Analyzer {
    config: AnalyzerConfig,
    store: Arc<dyn MessageStore>,
    provider: Arc<dyn LlmProvider>,
    ocr: Option<OcrCache>,
    debug: DebugWriter,
}

impl Analyzer {
    /// Build an analyzer with an explicit provider (tests inject canned
    /// outputs here).
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::ConfigurationError`] when the config fails
    /// validation. This is the fatal, before-any-I/O gate.
    pub fn new(
        config: AnalyzerConfig,
        store: Arc<dyn MessageStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> AnalyzerResult<Self> {
        config.validate()?;
        let debug = DebugWriter::new(config.debug.directory.clone());
        Ok(Self {
            config,
            store,
            provider,
            ocr: None,
            debug,
        })
    }

    /// Build an analyzer backed by the HTTP provider from the config.
    pub fn from_config(config: AnalyzerConfig, store: Arc<dyn MessageStore>) -> AnalyzerResult<Self> {
        config.validate()?;
        let provider = Arc::new(OpenAiCompatibleProvider::new(config.llm.clone())?);
        Self::new(config, store, provider)
    }

    /// Attach an OCR cache for image-content injection.
    pub fn with_ocr(mut self, ocr: OcrCache) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Analyze one day, optionally restricted to the given chatrooms.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store query itself fails; everything
    /// downstream degrades to warnings.
    pub async fn analyze(
        &self,
        date: NaiveDate,
        chatrooms: Option<&[String]>,
    ) -> AnalyzerResult<AnalysisReport> {
        let rows = self.store.load_day(date, chatrooms).await?;

        // Deterministic chatroom iteration regardless of store order.
        let mut by_chatroom: BTreeMap<String, Vec<_>> = BTreeMap::new();
        if let Some(wanted) = chatrooms {
            for chatroom in wanted {
                by_chatroom.entry(chatroom.clone()).or_default();
            }
        }
        for row in rows {
            by_chatroom.entry(row.chatroom.clone()).or_default().push(row);
        }

        let mut sections = Vec::new();
        let mut warnings = Vec::new();

        for (chatroom, mut room_rows) in by_chatroom {
            if room_rows.is_empty() {
                warnings.push(Warning {
                    chatroom: chatroom.clone(),
                    batch_index: None,
                    cause: "no data for requested chatroom".into(),
                });
            }

            // Ascending creation time; ties keep store order.
            room_rows.sort_by_key(|r| r.timestamp());

            let section = self
                .analyze_chatroom(date, &chatroom, room_rows, &mut warnings)
                .await;
            sections.push(section);
        }

        let generated_at = Utc::now();
        let markdown = report::render(date, generated_at, &sections);

        log_info!(
            date = %date,
            chatroom_count = sections.len(),
            warning_count = warnings.len(),
            "Analysis run complete"
        );

        Ok(AnalysisReport {
            date,
            markdown,
            sections,
            warnings,
        })
    }

    async fn analyze_chatroom(
        &self,
        date: NaiveDate,
        chatroom: &str,
        rows: Vec<crate::records::MessageRecord>,
        warnings: &mut Vec<Warning>,
    ) -> ChatroomSection {
        let timeline: Vec<EnrichedMessage> = rows.into_iter().map(formatter::enrich).collect();
        let message_total = timeline.len();

        let classified: Vec<EnrichedMessage> = timeline
            .iter()
            .filter(|m| !m.should_filter)
            .cloned()
            .collect();

        let batches = batcher::split_batches(classified, &self.config.batch, self.ocr.as_ref());

        let mut raw_topics: Vec<RawTopic> = Vec::new();
        for batch in &batches {
            match self.classify_batch(date, chatroom, batch).await {
                Ok((topics, batch_warnings)) => {
                    for cause in batch_warnings {
                        warnings.push(Warning {
                            chatroom: chatroom.to_string(),
                            batch_index: Some(batch.index),
                            cause,
                        });
                    }
                    raw_topics.extend(topics);
                }
                Err(error) => {
                    let annotated =
                        AnalyzerError::batch_failed(chatroom.to_string(), batch.index, error);
                    warnings.push(Warning {
                        chatroom: chatroom.to_string(),
                        batch_index: Some(batch.index),
                        cause: annotated.to_string(),
                    });
                }
            }
        }

        let outcome = merger::merge_topics(raw_topics, self.config.merge.threshold);
        self.debug.merge_report(chatroom, &outcome.report);

        let summarizer = Summarizer {
            provider: self.provider.as_ref(),
            options: &self.config.summary,
            batch_options: &self.config.batch,
            debug: &self.debug,
        };

        let mut topics: Vec<FinalTopic> = Vec::new();
        let mut summary_warnings: Vec<String> = Vec::new();
        for (topic_index, merged) in outcome.topics.into_iter().enumerate() {
            let mut topic = summarizer
                .summarize(
                    chatroom,
                    topic_index,
                    merged,
                    &timeline,
                    self.ocr.as_ref(),
                    &mut summary_warnings,
                )
                .await;
            topic.popularity = popularity(
                topic.merged.participants.len(),
                topic.merged.message_count,
            );
            topics.push(topic);
        }
        for cause in summary_warnings {
            warnings.push(Warning {
                chatroom: chatroom.to_string(),
                batch_index: None,
                cause,
            });
        }

        // Descending popularity; stable sort keeps insertion order on ties.
        topics.sort_by(|a, b| {
            b.popularity
                .partial_cmp(&a.popularity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        topics.truncate(self.config.report.top_n);

        ChatroomSection {
            chatroom: chatroom.to_string(),
            message_total,
            topics,
        }
    }

    /// Run one batch through the model and parse the response.
    async fn classify_batch(
        &self,
        date: NaiveDate,
        chatroom: &str,
        batch: &Batch,
    ) -> AnalyzerResult<(Vec<RawTopic>, Vec<String>)> {
        let (start, end) = batch.time_range();
        let date_range = if start.is_some() || end.is_some() {
            timeutil::build_date_range(start, end)
        } else {
            date.format("%Y-%m-%d").to_string()
        };

        let messages = prompts::classification(chatroom, &date_range, &batch.lines);
        let input_text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.debug.batch_input(chatroom, batch.index, &input_text);

        let response = self.provider.invoke(&messages).await?;
        self.debug.batch_output(chatroom, batch.index, &response);

        let parsed = protocol::parse_topics(&response, batch.len());
        let mut batch_warnings = parsed.warnings;
        let topics =
            protocol::resolve_message_ids(parsed.topics, &batch.seq_to_msg, &mut batch_warnings);
        self.debug.batch_topics(chatroom, batch.index, &topics);

        if !batch_warnings.is_empty() {
            log_warn!(
                chatroom = %chatroom,
                batch_index = batch.index,
                warning_count = batch_warnings.len(),
                "Batch parsed with warnings"
            );
        }

        Ok((topics, batch_warnings))
    }
}
