//! Shared helpers for HTTP-level integration tests.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use chatscope::LlmOptions;

/// Provider options pointing at a mock server, with fast retries.
pub fn test_llm_options(base_url: String) -> LlmOptions {
    LlmOptions {
        model_name: "test-model".to_string(),
        api_base_url: base_url,
        api_key: "test-key".to_string(),
        temperature: 0.2,
        max_tokens: 512,
        request_timeout_seconds: 5,
        max_retries: 2,
        backoff_seconds: 0,
    }
}

/// A well-formed chat-completions body with the given assistant text.
pub fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
}
