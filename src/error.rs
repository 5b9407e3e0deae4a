//! Error types for the analysis pipeline.
//!
//! This module provides structured error handling for chatscope operations,
//! including categorization and retry guidance.
//!
//! # Error Types
//!
//! The main error type is [`AnalyzerError`], which covers all failure modes:
//! - Configuration errors (missing credentials, invalid settings)
//! - Data-access failures (store unavailable, schema mismatch)
//! - Request failures (network issues, upstream errors)
//! - Rate limiting and timeouts
//! - Response-body decode failures
//!
//! # Failure posture
//!
//! Errors escalate differently depending on where they occur (see the
//! coordinator in [`crate::analyzer`]):
//! - Configuration errors abort the run before any I/O.
//! - Store errors abort the affected chatroom only.
//! - LLM errors abort the affected batch only; the run continues.
//! - Wire-format problems never become errors at all - the protocol parser
//!   degrades to warnings.
//!
//! # Result Type
//!
//! Use [`AnalyzerResult<T>`] as a convenient alias for
//! `Result<T, AnalyzerError>`.

use crate::logging::{log_error, log_warn};
use thiserror::Error;

// ============================================================================
// Error categorization types
// ============================================================================

/// High-level categorization of errors for routing and handling decisions.
///
/// Use [`AnalyzerError::category()`] to get the category for any error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// External service failures (LLM endpoint, network issues).
    ///
    /// The upstream endpoint or network had an issue. May be transient
    /// or indicate an outage.
    External,

    /// Client errors (invalid input, authentication, configuration).
    ///
    /// The caller made a mistake that they can fix (wrong API key,
    /// invalid parameters, etc.).
    Client,

    /// Temporary failures that should be retried.
    ///
    /// Rate limits, timeouts, and other transient issues. Retry
    /// with exponential backoff.
    Transient,

    /// Internal system errors (bugs, invariant violations).
    Internal,
}

/// Convenient result type for pipeline operations.
///
/// Alias for `Result<T, AnalyzerError>`. Use this throughout the crate
/// for consistent error handling.
pub type AnalyzerResult<T> = std::result::Result<T, AnalyzerError>;

/// Errors that can occur during chatroom analysis.
///
/// Each variant can be categorized via [`category()`](Self::category) and
/// checked for retryability via [`is_retryable()`](Self::is_retryable).
///
/// # Creating Errors
///
/// Use the constructor methods which automatically log the error:
///
/// ```rust
/// use chatscope::AnalyzerError;
///
/// // These methods log automatically
/// let err = AnalyzerError::configuration_error("Missing API key");
/// let err = AnalyzerError::rate_limited(60);
/// let err = AnalyzerError::timeout(30);
/// ```
///
/// # Error Categories
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `ConfigurationError` | Client | No |
/// | `StoreError` | External | No |
/// | `RequestFailed` | External | Yes |
/// | `RateLimited` | Transient | Yes |
/// | `Timeout` | Transient | Yes |
/// | `UpstreamError` | External | Yes |
/// | `Rejected` | Client | No |
/// | `ResponseDecodeError` | External | No |
/// | `BatchFailed` | (inner) | No |
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Pipeline configuration is invalid or incomplete.
    ///
    /// Common causes:
    /// - Missing model name, base URL, or API key
    /// - Out-of-range numeric options (e.g. zero batch capacity)
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The columnar store could not be read for a chatroom/date.
    ///
    /// Fatal for the affected chatroom; the coordinator records it as
    /// "no data" and proceeds to the next chatroom.
    #[error("Store error: {message}")]
    StoreError {
        /// Description of the failure.
        message: String,
    },

    /// The HTTP request to the endpoint failed before a status was received.
    ///
    /// Connection resets, DNS failures, and similar network-level problems.
    #[error("Request failed: {message}")]
    RequestFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Endpoint rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Recommended wait time before retrying.
        retry_after_seconds: u64,
    },

    /// Request timed out.
    #[error("Request timed out after {timeout_seconds}s")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout_seconds: u64,
    },

    /// The endpoint returned a 5xx status.
    #[error("Upstream error: HTTP {status}")]
    UpstreamError {
        /// The HTTP status code received.
        status: u16,
    },

    /// The endpoint rejected the request with a non-retryable 4xx status.
    #[error("Request rejected: HTTP {status}: {message}")]
    Rejected {
        /// The HTTP status code received.
        status: u16,
        /// Response body or reason, when available.
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    ///
    /// The endpoint answered, but the completion payload was malformed.
    /// Not retryable; surfaced to the caller.
    #[error("Response decode failed: {message}")]
    ResponseDecodeError {
        /// Details about the decode failure.
        message: String,
    },

    /// A batch-level failure annotated with its batch identity.
    ///
    /// Produced by the coordinator when an invocation exhausts its retries;
    /// the inner error carries the original cause.
    #[error("Batch {batch_index} of {chatroom} failed: {source}")]
    BatchFailed {
        /// Chatroom the batch belongs to.
        chatroom: String,
        /// Zero-based batch index within the chatroom.
        batch_index: usize,
        /// The original failure.
        #[source]
        source: Box<AnalyzerError>,
    },
}

impl AnalyzerError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError { .. } => ErrorCategory::Client,
            Self::StoreError { .. } => ErrorCategory::External,
            Self::RequestFailed { .. } => ErrorCategory::External,
            Self::RateLimited { .. } => ErrorCategory::Transient,
            Self::Timeout { .. } => ErrorCategory::Transient,
            Self::UpstreamError { .. } => ErrorCategory::External,
            Self::Rejected { .. } => ErrorCategory::Client,
            Self::ResponseDecodeError { .. } => ErrorCategory::External,
            Self::BatchFailed { source, .. } => source.category(),
        }
    }

    /// Whether this error is transient and should trigger a retry.
    ///
    /// Returns `true` for:
    /// - Network-level request failures
    /// - Rate limiting (HTTP 429)
    /// - Timeouts
    /// - Upstream 5xx statuses
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. }
                | Self::RateLimited { .. }
                | Self::Timeout { .. }
                | Self::UpstreamError { .. }
        )
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================
    //
    // These methods automatically log the error at the appropriate level.
    // Use them instead of constructing variants directly.

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Analyzer configuration validation failed"
        );
        Self::ConfigurationError { message }
    }

    pub fn store_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "store_error",
            message = %message,
            "Message store read failed"
        );
        Self::StoreError { message }
    }

    pub fn request_failed(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let message = message.into();
        log_error!(
            error_type = "request_failed",
            message = %message,
            has_source = source.is_some(),
            "LLM request execution failed"
        );
        Self::RequestFailed { message, source }
    }

    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        log_warn!(
            error_type = "rate_limited",
            retry_after_seconds = retry_after_seconds,
            "LLM endpoint rate limit exceeded"
        );
        Self::RateLimited {
            retry_after_seconds,
        }
    }

    pub fn timeout(timeout_seconds: u64) -> Self {
        log_warn!(
            error_type = "timeout",
            timeout_seconds = timeout_seconds,
            "LLM request timed out"
        );
        Self::Timeout { timeout_seconds }
    }

    pub fn upstream_error(status: u16) -> Self {
        log_warn!(
            error_type = "upstream_error",
            status = status,
            "LLM endpoint returned server error"
        );
        Self::UpstreamError { status }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "rejected",
            status = status,
            message = %message,
            "LLM endpoint rejected request"
        );
        Self::Rejected { status, message }
    }

    pub fn response_decode_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "response_decode_error",
            message = %message,
            "LLM response body invalid"
        );
        Self::ResponseDecodeError { message }
    }

    /// Annotate an error with the identity of the batch it killed.
    pub fn batch_failed(chatroom: impl Into<String>, batch_index: usize, source: Self) -> Self {
        let chatroom = chatroom.into();
        log_warn!(
            error_type = "batch_failed",
            chatroom = %chatroom,
            batch_index = batch_index,
            source = %source,
            "Batch classification failed, skipping batch"
        );
        Self::BatchFailed {
            chatroom,
            batch_index,
            source: Box::new(source),
        }
    }
}
