//! The LLM provider seam.
//!
//! The pipeline talks to the model through [`LlmProvider`], a minimal
//! interface that takes a prepared system+user message pair and returns the
//! assistant's text. Production has one implementation (the HTTP client in
//! [`crate::providers::openai`]); tests inject canned outputs.

use crate::error::AnalyzerResult;
use async_trait::async_trait;

/// Role of a chat message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Instructions and protocol description.
    System,
    /// The batch payload.
    User,
}

impl ChatRole {
    /// Wire name used by OpenAI-compatible endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

/// One message of the prompt pair.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Message role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Interface to a chat-completion model.
///
/// Implementations own their retry behavior: a returned error means the
/// invocation is spent and the caller should apply its partial-failure
/// policy rather than retry again.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and return the assistant message text.
    async fn invoke(&self, messages: &[ChatMessage]) -> AnalyzerResult<String>;

    /// The model this provider invokes, for logging and debug artifacts.
    fn model_name(&self) -> &str;
}
