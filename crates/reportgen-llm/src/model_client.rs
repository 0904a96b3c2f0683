//! Retrying text generation on top of a backend.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::LlmError;
use crate::config::Config;
use crate::types::{GenerationFailure, LlmBackend, LlmInvocation, Message, TextGenerator};

/// Retry policy applied to every prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Responses shorter than this after trimming are treated as failures.
    pub min_response_length: usize,
    /// Attempt `n` (zero-based) waits `backoff_base * 2^n` before the next one.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_response_length: 10,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts().max(1),
            min_response_length: config.min_response_length(),
            backoff_base: config.backoff_base(),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// The model-call collaborator used by every generator.
///
/// Failures are classified rather than raised:
///
/// - a provider block stops immediately with [`GenerationFailure::ContentBlocked`]
/// - credentials, budget, and request errors stop immediately with
///   [`GenerationFailure::Unavailable`]
/// - quota, outage, timeout and transport errors are retried; exhausting the
///   attempts yields [`GenerationFailure::Transient`]
/// - too-short responses are retried; exhausting the attempts yields
///   [`GenerationFailure::Unavailable`]
pub struct ModelClient {
    backend: Box<dyn LlmBackend>,
    model: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl ModelClient {
    pub fn new(
        backend: Box<dyn LlmBackend>,
        model: impl Into<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            timeout,
            policy,
        }
    }

    /// Build a client whose model, timeout and retry policy come from `config`.
    ///
    /// `model` may be empty to let the backend pick its configured default.
    pub fn from_config(backend: Box<dyn LlmBackend>, model: impl Into<String>, config: &Config) -> Self {
        Self::new(
            backend,
            model,
            config.request_timeout(),
            RetryPolicy::from_config(config),
        )
    }

    fn classify(error: LlmError) -> Result<GenerationFailure, GenerationFailure> {
        // Ok means "retry", Err means "stop now".
        match error {
            LlmError::ContentBlocked(reason) => Err(GenerationFailure::ContentBlocked(reason)),
            e if e.is_retryable() => Ok(GenerationFailure::Transient(e.to_string())),
            e => Err(GenerationFailure::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl TextGenerator for ModelClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationFailure> {
        let mut last_failure =
            GenerationFailure::Unavailable("no attempts were made".to_string());

        for attempt in 0..self.policy.max_attempts {
            let inv = LlmInvocation::new(
                self.model.clone(),
                self.timeout,
                vec![Message::user(prompt)],
            );

            debug!(
                attempt = attempt + 1,
                max_attempts = self.policy.max_attempts,
                prompt_chars = prompt.chars().count(),
                "Requesting completion"
            );

            match self.backend.invoke(inv).await {
                Ok(result) => {
                    let text = result.raw_response.trim();
                    if text.chars().count() >= self.policy.min_response_length {
                        debug!(
                            provider = %result.provider,
                            model = %result.model_used,
                            attempt = attempt + 1,
                            "Completion accepted"
                        );
                        return Ok(text.to_string());
                    }
                    warn!(
                        attempt = attempt + 1,
                        length = text.chars().count(),
                        "Response too short, retrying"
                    );
                    last_failure = GenerationFailure::Unavailable(format!(
                        "response shorter than {} characters",
                        self.policy.min_response_length
                    ));
                }
                Err(e) => match Self::classify(e) {
                    Ok(retryable) => {
                        warn!(attempt = attempt + 1, error = %retryable, "Model call failed, retrying");
                        last_failure = retryable;
                    }
                    Err(terminal) => {
                        warn!(error = %terminal, "Model call failed permanently");
                        return Err(terminal);
                    }
                },
            }

            if attempt + 1 < self.policy.max_attempts {
                tokio::time::sleep(self.policy.backoff(attempt)).await;
            }
        }

        Err(last_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LlmResult;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays queued outcomes and counts calls.
    struct QueueBackend {
        outcomes: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<u32>,
    }

    impl QueueBackend {
        fn new(outcomes: Vec<Result<String, LlmError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for QueueBackend {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            *self.calls.lock().unwrap() += 1;
            let next = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("queue empty".to_string())));
            next.map(|text| LlmResult::new(text, "test", "test-model"))
        }
    }

    fn client(backend: QueueBackend) -> ModelClient {
        let policy = RetryPolicy {
            max_attempts: 3,
            min_response_length: 10,
            backoff_base: Duration::ZERO,
        };
        ModelClient::new(Box::new(backend), "", Duration::from_secs(5), policy)
    }

    #[tokio::test]
    async fn test_returns_trimmed_text() {
        let client = client(QueueBackend::new(vec![Ok("  A long enough answer \n".to_string())]));
        assert_eq!(client.generate("p").await.unwrap(), "A long enough answer");
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let client = client(QueueBackend::new(vec![
            Err(LlmError::ProviderQuota("429".to_string())),
            Err(LlmError::ProviderOutage("503".to_string())),
            Ok("Finally a usable response".to_string()),
        ]));
        assert!(client.generate("p").await.is_ok());
    }

    #[tokio::test]
    async fn test_exhausted_transient_errors_are_transient() {
        let client = client(QueueBackend::new(vec![
            Err(LlmError::Timeout {
                duration: Duration::from_secs(1),
            }),
            Err(LlmError::Timeout {
                duration: Duration::from_secs(1),
            }),
            Err(LlmError::Transport("reset".to_string())),
        ]));
        assert!(matches!(
            client.generate("p").await,
            Err(GenerationFailure::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_short_responses_exhaust_to_unavailable() {
        let client = client(QueueBackend::new(vec![
            Ok("short".to_string()),
            Ok("".to_string()),
            Ok("tiny".to_string()),
        ]));
        assert!(matches!(
            client.generate("p").await,
            Err(GenerationFailure::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_block_stops_immediately() {
        let backend = QueueBackend::new(vec![
            Err(LlmError::ContentBlocked("SAFETY".to_string())),
            Ok("never reached, never reached".to_string()),
        ]);
        let policy = RetryPolicy {
            backoff_base: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let backend = std::sync::Arc::new(backend);
        let client = ModelClient::new(
            Box::new(SharedBackend(backend.clone())),
            "",
            Duration::from_secs(5),
            policy,
        );

        assert!(matches!(
            client.generate("p").await,
            Err(GenerationFailure::ContentBlocked(_))
        ));
        assert_eq!(*backend.calls.lock().unwrap(), 1, "blocked prompts are not retried");
    }

    #[tokio::test]
    async fn test_auth_failure_stops_immediately() {
        let backend = std::sync::Arc::new(QueueBackend::new(vec![Err(LlmError::ProviderAuth(
            "401".to_string(),
        ))]));
        let client = ModelClient::new(
            Box::new(SharedBackend(backend.clone())),
            "",
            Duration::from_secs(5),
            RetryPolicy {
                backoff_base: Duration::ZERO,
                ..RetryPolicy::default()
            },
        );

        assert!(matches!(
            client.generate("p").await,
            Err(GenerationFailure::Unavailable(_))
        ));
        assert_eq!(*backend.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            backoff_base: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    struct SharedBackend(std::sync::Arc<QueueBackend>);

    #[async_trait]
    impl LlmBackend for SharedBackend {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            self.0.invoke(inv).await
        }
    }
}
