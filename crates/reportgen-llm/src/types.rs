//! Core types for model backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Input to a backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Model to use; empty means the backend default.
    pub model: String,
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Provider-specific parameters (e.g. temperature, max_tokens)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Result from a backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text from the model
    pub raw_response: String,
    /// Provider name (e.g., "gemini", "openrouter", "anthropic")
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    /// Provider-specific extensions (finish reasons and the like)
    pub extensions: HashMap<String, serde_json::Value>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
            extensions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }
}

/// Information about a fallback provider being used instead of the primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmFallbackInfo {
    pub primary_provider: String,
    pub fallback_provider: String,
    /// Redacted construction error of the primary provider.
    pub reason: String,
}

/// Trait for model backend implementations
///
/// Every HTTP provider implements this trait so that the generator can work
/// with any of them without knowing implementation details.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the model with the given invocation parameters
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors (auth,
    /// quota, outages, content blocks), timeouts and budget exhaustion.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}

/// Why a prompt produced no usable text.
///
/// Generators turn these into their documented fallbacks; they are never
/// raised to the caller of a report request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    /// Retryable provider trouble persisted through every attempt.
    #[error("transient model failure: {0}")]
    Transient(String),
    /// The provider refused the prompt.
    #[error("content blocked: {0}")]
    ContentBlocked(String),
    /// No usable text: credentials, budget, or responses too short to use.
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Text-in, text-out model access used by every generator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a non-empty, trimmed completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationFailure>;
}
