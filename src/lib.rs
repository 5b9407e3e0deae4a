//! # chatscope
//!
//! Offline analysis of chatroom messages: a day's rows from the columnar
//! store are classified and clustered into discussion topics by an LLM,
//! merged across batches, summarized in two stages, ranked by a popularity
//! heuristic, and rendered as a Markdown report.
//!
//! ## Key Features
//!
//! - **Token-budget batching**: daily traffic is cut into model-sized
//!   batches without truncating or dropping messages
//! - **Delimited wire protocol**: a marker-based output format that parses
//!   partially instead of failing, chosen over JSON for robustness
//! - **Cross-batch merging**: keyword-similarity clustering reconciles
//!   topic fragments split by batch boundaries
//! - **Partial-failure tolerance**: a dead batch or a garbled response
//!   costs only its own topics, never the run
//! - **Debug artifacts**: per-batch inputs/outputs/topics and a merge
//!   report, written best-effort
//!
//! ## Example
//!
//! ```rust,no_run
//! use chatscope::{Analyzer, AnalyzerConfig, InMemoryStore, LlmOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AnalyzerConfig {
//!     llm: LlmOptions {
//!         model_name: "qwen-plus".to_string(),
//!         api_base_url: "https://api.example.com".to_string(),
//!         api_key: "sk-...".to_string(),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let store = Arc::new(InMemoryStore::new(vec![]));
//! let analyzer = Analyzer::from_config(config, store)?;
//!
//! let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
//! let report = analyzer.analyze(date, None).await?;
//! println!("{}", report.markdown);
//! # Ok(())
//! # }
//! ```

// Allow missing errors documentation - errors are self-documenting via type signatures
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// Module declarations
// =============================================================================

// Public modules - flattened structure
pub mod analyzer;
pub mod batcher;
pub mod config;
pub mod debug_writer;
pub mod error;
pub mod formatter;
pub mod merger;
pub mod prompts;
pub mod protocol;
pub mod provider;
pub mod providers;
pub mod records;
pub mod report;
pub mod store;
pub mod summarizer;
pub mod timeutil;
pub mod topics;

// Internal modules
pub(crate) mod internals;
pub(crate) mod logging;

#[cfg(test)]
pub mod tests;

// =============================================================================
// Public API re-exports
// =============================================================================

// Coordinator
pub use analyzer::{popularity, AnalysisReport, Analyzer, Warning};

// Configuration
pub use config::{
    AnalyzerConfig, BatchOptions, DebugOptions, LlmOptions, MergeOptions, ReportOptions,
    SummaryOptions,
};

// Errors
pub use error::{AnalyzerError, AnalyzerResult, ErrorCategory};

// Records and topics - the pipeline's value objects
pub use records::{EnrichedMessage, MessageRecord};
pub use topics::{FinalTopic, MergedTopic, RawTopic, SummaryDraft};

// Provider seam and the production implementation
pub use provider::{ChatMessage, ChatRole, LlmProvider};
pub use providers::OpenAiCompatibleProvider;

// Collaborator seams
pub use store::{InMemoryStore, MessageStore, OcrCache};

// Batching and merging building blocks
pub use batcher::Batch;
pub use debug_writer::DebugWriter;
pub use merger::{keyword_similarity, merge_topics, MergeOutcome};
pub use report::ChatroomSection;

// Retry policy (from internals, re-exported for public use)
pub use internals::retry::RetryPolicy;
