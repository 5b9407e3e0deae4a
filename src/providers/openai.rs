//! OpenAI-compatible chat-completions provider.
//!
//! Posts a system+user pair to `{base_url}/v1/chat/completions` with a
//! Bearer credential and returns the single assistant message. Streaming is
//! not used. Transient failures (network errors, timeouts, HTTP 429,
//! HTTP >= 500) are retried through [`RetryExecutor`]; other statuses and
//! body decode failures surface immediately.

use crate::config::LlmOptions;
use crate::error::{AnalyzerError, AnalyzerResult};
use crate::internals::retry::{RetryExecutor, RetryPolicy};
use crate::logging::{log_debug, log_warn};
use crate::provider::{ChatMessage, LlmProvider};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

/// HTTP provider for any OpenAI-compatible endpoint.
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    options: LlmOptions,
    executor: RetryExecutor,
}

impl OpenAiCompatibleProvider {
    /// Build the provider from validated options.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::ConfigurationError`] if a required field is
    /// empty or the HTTP client cannot be constructed.
    pub fn new(options: LlmOptions) -> AnalyzerResult<Self> {
        if options.model_name.is_empty() || options.api_base_url.is_empty() {
            return Err(AnalyzerError::configuration_error(
                "model_name and api_base_url are required",
            ));
        }
        if options.api_key.is_empty() {
            return Err(AnalyzerError::configuration_error("api_key is required"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AnalyzerError::configuration_error(format!("Failed to build HTTP client: {}", e))
            })?;

        let executor = RetryExecutor::new(RetryPolicy {
            max_retries: options.max_retries,
            backoff_seconds: options.backoff_seconds,
            request_timeout: Duration::from_secs(options.request_timeout_seconds),
        });

        log_debug!(
            model = %options.model_name,
            base_url = %options.api_base_url,
            max_retries = options.max_retries,
            "OpenAI-compatible provider initialized"
        );

        Ok(Self {
            http,
            options,
            executor,
        })
    }

    fn build_auth_headers(&self) -> AnalyzerResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", self.options.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer).map_err(|e| {
                AnalyzerError::configuration_error(format!("Invalid API key header: {}", e))
            })?,
        );
        Ok(headers)
    }

    async fn send_once(&self, messages: &[ChatMessage]) -> AnalyzerResult<String> {
        let body = CompletionRequest {
            model: &self.options.model_name,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.options.api_base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .headers(self.build_auth_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::timeout(self.options.request_timeout_seconds)
                } else {
                    AnalyzerError::request_failed(
                        format!("Request to {} failed", url),
                        Some(Box::new(e)),
                    )
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.options.backoff_seconds);
            return Err(AnalyzerError::rate_limited(retry_after));
        }
        if status.is_server_error() {
            return Err(AnalyzerError::upstream_error(status.as_u16()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(AnalyzerError::rejected(status.as_u16(), snippet));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            AnalyzerError::response_decode_error(format!("Completion body malformed: {}", e))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            AnalyzerError::response_decode_error("No choices in completion response")
        })?;

        Ok(choice.message.content)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn invoke(&self, messages: &[ChatMessage]) -> AnalyzerResult<String> {
        let result = self.executor.execute(|| self.send_once(messages)).await;
        if let Err(ref error) = result {
            log_warn!(
                model = %self.options.model_name,
                error = %error,
                "Invocation spent, surfacing to coordinator"
            );
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.options.model_name
    }
}
