//! Configuration types for the analysis pipeline.
//!
//! This module provides the option groups threaded through the pipeline.
//! Configuration is an explicit struct; there are no singletons. Each group
//! carries the documented defaults and [`AnalyzerConfig::validate`] is the
//! gate that turns a malformed setup into a fatal error before any I/O.
//!
//! # Quick Start
//!
//! ```rust
//! use chatscope::{AnalyzerConfig, LlmOptions};
//!
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
//! config.validate()?;
//! # Ok::<(), chatscope::AnalyzerError>(())
//! ```
//!
//! # From Environment Variables
//!
//! [`AnalyzerConfig::from_env`] reads `CHATSCOPE_MODEL`,
//! `CHATSCOPE_API_BASE_URL` and `CHATSCOPE_API_KEY`, plus optional numeric
//! overrides for every other option.

use crate::error::{AnalyzerError, AnalyzerResult};
use crate::logging::log_debug;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for the chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmOptions {
    /// Model to invoke. Required.
    pub model_name: String,
    /// OpenAI-compatible endpoint URL. Required.
    pub api_base_url: String,
    /// Credential sent as a Bearer header. Required.
    pub api_key: String,
    /// Sampling temperature. Low for classification determinism.
    pub temperature: f32,
    /// Generation cap per completion.
    pub max_tokens: u32,
    /// Per-call timeout in seconds.
    pub request_timeout_seconds: u64,
    /// Retry attempts for transient failures.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds (2, 4, 8, ...).
    pub backoff_seconds: u64,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            api_base_url: String::new(),
            api_key: String::new(),
            temperature: 0.2,
            max_tokens: 4096,
            request_timeout_seconds: 60,
            max_retries: 3,
            backoff_seconds: 2,
        }
    }
}

/// Options controlling how a chatroom's day is split into batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Soft upper bound on estimated tokens per batch.
    pub max_tokens: usize,
    /// Hard upper bound on messages per batch.
    pub max_messages: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_tokens: 6000,
            max_messages: 200,
        }
    }
}

/// Options for cross-batch topic merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Similarity threshold above which two topics join one cluster.
    pub threshold: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Options for two-stage topic summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Target messages per stage-1 chunk.
    pub chunk_messages: usize,
    /// Neighbor messages included around small topics.
    pub context_window: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            chunk_messages: 40,
            context_window: 3,
        }
    }
}

/// Options for debug artifact output.
///
/// With `directory = None` the debug writer is a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugOptions {
    /// Debug output root; `None` disables all artifact writes.
    pub directory: Option<PathBuf>,
}

/// Options for the rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Topics kept per chatroom after ranking.
    pub top_n: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

/// Pipeline-wide configuration.
///
/// Combines the per-component option groups. Construct it directly or with
/// [`from_env()`](Self::from_env), then call [`validate()`](Self::validate)
/// before handing it to the analyzer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Endpoint credentials and sampling parameters.
    pub llm: LlmOptions,
    /// Batch sizing.
    pub batch: BatchOptions,
    /// Merge threshold.
    pub merge: MergeOptions,
    /// Summarization chunking.
    pub summary: SummaryOptions,
    /// Debug artifact output.
    pub debug: DebugOptions,
    /// Report shaping.
    pub report: ReportOptions,
}

/// Read an env var and parse it, falling back to the default when unset.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> AnalyzerResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| {
            AnalyzerError::configuration_error(format!("{} is not a valid value: {:?}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn env_required(name: &str) -> AnalyzerResult<String> {
    std::env::var(name)
        .map_err(|_| AnalyzerError::configuration_error(format!("{} is required", name)))
}

impl AnalyzerConfig {
    /// Load configuration from `CHATSCOPE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::ConfigurationError`] if a required variable
    /// is missing or a numeric override fails to parse.
    pub fn from_env() -> AnalyzerResult<Self> {
        let defaults = Self::default();

        let config = Self {
            llm: LlmOptions {
                model_name: env_required("CHATSCOPE_MODEL")?,
                api_base_url: env_required("CHATSCOPE_API_BASE_URL")?,
                api_key: env_required("CHATSCOPE_API_KEY")?,
                temperature: env_parse("CHATSCOPE_TEMPERATURE", defaults.llm.temperature)?,
                max_tokens: env_parse("CHATSCOPE_MAX_TOKENS", defaults.llm.max_tokens)?,
                request_timeout_seconds: env_parse(
                    "CHATSCOPE_REQUEST_TIMEOUT_SECONDS",
                    defaults.llm.request_timeout_seconds,
                )?,
                max_retries: env_parse("CHATSCOPE_MAX_RETRIES", defaults.llm.max_retries)?,
                backoff_seconds: env_parse(
                    "CHATSCOPE_BACKOFF_SECONDS",
                    defaults.llm.backoff_seconds,
                )?,
            },
            batch: BatchOptions {
                max_tokens: env_parse("CHATSCOPE_BATCH_MAX_TOKENS", defaults.batch.max_tokens)?,
                max_messages: env_parse(
                    "CHATSCOPE_BATCH_MAX_MESSAGES",
                    defaults.batch.max_messages,
                )?,
            },
            merge: MergeOptions {
                threshold: env_parse("CHATSCOPE_MERGE_THRESHOLD", defaults.merge.threshold)?,
            },
            summary: SummaryOptions {
                chunk_messages: env_parse(
                    "CHATSCOPE_SUMMARY_CHUNK_MESSAGES",
                    defaults.summary.chunk_messages,
                )?,
                context_window: env_parse(
                    "CHATSCOPE_SUMMARY_CONTEXT_WINDOW",
                    defaults.summary.context_window,
                )?,
            },
            debug: DebugOptions {
                directory: std::env::var("CHATSCOPE_DEBUG_DIR").ok().map(PathBuf::from),
            },
            report: ReportOptions {
                top_n: env_parse("CHATSCOPE_REPORT_TOP_N", defaults.report.top_n)?,
            },
        };

        log_debug!(
            model = %config.llm.model_name,
            base_url = %config.llm.api_base_url,
            "Loaded analyzer configuration from environment"
        );

        Ok(config)
    }

    /// Validate that the configuration is complete and usable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::ConfigurationError`] if:
    /// - Any of the three required LLM fields is empty
    /// - A capacity option is zero
    /// - The merge threshold is outside `[0, 1]`
    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.llm.model_name.is_empty() {
            return Err(AnalyzerError::configuration_error("model_name is required"));
        }
        if self.llm.api_base_url.is_empty() {
            return Err(AnalyzerError::configuration_error(
                "api_base_url is required",
            ));
        }
        if self.llm.api_key.is_empty() {
            return Err(AnalyzerError::configuration_error("api_key is required"));
        }
        if self.batch.max_tokens == 0 || self.batch.max_messages == 0 {
            return Err(AnalyzerError::configuration_error(
                "batch capacities must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.merge.threshold) {
            return Err(AnalyzerError::configuration_error(
                "merge threshold must be within [0, 1]",
            ));
        }
        if self.summary.chunk_messages == 0 {
            return Err(AnalyzerError::configuration_error(
                "summary chunk size must be positive",
            ));
        }
        Ok(())
    }
}
