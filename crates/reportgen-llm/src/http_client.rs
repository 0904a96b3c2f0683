//! Shared HTTP client infrastructure for the provider backends
//!
//! One `reqwest::Client` per backend, with timeout and retry policies for
//! reliable communication with model providers.

use crate::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default maximum HTTP timeout (5 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retry attempts for 5xx and network failures
const MAX_RETRIES: u32 = 2;

/// Initial backoff duration for retries (1 second)
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Longest provider error body quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            temperature: 0.7,
        }
    }
}

impl HttpParams {
    /// Per-invocation overrides from `metadata["max_tokens"]` and
    /// `metadata["temperature"]`.
    pub(crate) fn resolve(
        &self,
        metadata: &std::collections::HashMap<String, serde_json::Value>,
    ) -> HttpParams {
        let max_tokens = metadata
            .get("max_tokens")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(self.max_tokens);

        let temperature = metadata
            .get("temperature")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(self.temperature);

        HttpParams {
            max_tokens,
            temperature,
        }
    }
}

/// Shared HTTP client for model providers
///
/// Provides connection reuse, bounded timeouts, retry with backoff for 5xx
/// and network failures, and TLS via rustls.
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
        })
    }

    /// A request builder bound to the shared connection pool.
    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Execute an HTTP request with timeout and retry policy
    ///
    /// - Per-request timeout: `min(request_timeout, max_timeout)`
    /// - Up to 2 retries for 5xx and network failures, backing off 1s then 2s
    /// - No retries for 4xx errors
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403 and rejected API keys
    /// - `LlmError::ProviderQuota` for 429
    /// - `LlmError::Misconfiguration` for other 4xx (bad model name, malformed request)
    /// - `LlmError::ProviderOutage` for 5xx after retries
    /// - `LlmError::Timeout` for timeouts
    /// - `LlmError::Transport` for network errors after retries
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| {
                    LlmError::Transport("Failed to clone request for retry".to_string())
                })?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| LlmError::Transport(format!("Failed to build request: {}", e)))?;

            debug!(
                provider = provider_name,
                attempt = attempt,
                timeout_secs = effective_timeout.as_secs(),
                "Executing HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(map_client_error(status, provider_name, &body));
                    }

                    if status.is_server_error() {
                        if attempt <= MAX_RETRIES {
                            warn!(
                                provider = provider_name,
                                attempt = attempt,
                                status = status.as_u16(),
                                "Server error, will retry"
                            );
                            tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                            continue;
                        }

                        return Err(LlmError::ProviderOutage(format!(
                            "{} returned server error: {}",
                            provider_name, status
                        )));
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(LlmError::Timeout {
                            duration: effective_timeout,
                        });
                    }

                    let redacted = redact_error_message(&e.to_string());

                    if attempt <= MAX_RETRIES {
                        warn!(
                            provider = provider_name,
                            attempt = attempt,
                            error = %redacted,
                            "Network error, will retry"
                        );
                        tokio::time::sleep(INITIAL_BACKOFF * attempt).await;
                        continue;
                    }

                    return Err(LlmError::Transport(format!(
                        "{} request failed: {}",
                        provider_name, redacted
                    )));
                }
            }
        }
    }
}

/// Map HTTP client error status codes to LlmError variants
///
/// Gemini reports a bad key as `400 INVALID_ARGUMENT` with `API_KEY_INVALID`
/// in the body, so the body is consulted before falling back on the status.
fn map_client_error(status: StatusCode, provider_name: &str, body: &str) -> LlmError {
    let excerpt: String = redact_error_message(body.trim())
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();

    if body.contains("API_KEY_INVALID") || body.contains("API key not valid") {
        return LlmError::ProviderAuth(format!(
            "{} rejected the API key: {}",
            provider_name, status
        ));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{} authentication failed: {}",
            provider_name, status
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            LlmError::ProviderQuota(format!("{} rate limit exceeded: {}", provider_name, status))
        }
        StatusCode::REQUEST_TIMEOUT => LlmError::Transport(format!(
            "{} returned client error: {}",
            provider_name, status
        )),
        _ => LlmError::Misconfiguration(format!(
            "{} rejected the request: {} {}",
            provider_name, status, excerpt
        )),
    }
}

/// Pattern to match URLs with embedded credentials
static URL_WITH_CREDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)[^:@\s]+:[^@\s]+@").expect("credential URL pattern is valid")
});

/// Pattern to match `key=` query parameters (Gemini accepts the key in the URL)
static KEY_QUERY_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([?&]key=)[^&\s]+").expect("key parameter pattern is valid")
});

/// Pattern to match potential API keys (long alphanumeric strings)
static POTENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_-])[A-Za-z0-9_-]{32,}(?:[^A-Za-z0-9_-]|$)")
        .expect("key pattern is valid")
});

/// Redact sensitive information from error messages
///
/// - URLs with embedded credentials lose the credentials
/// - `key=` query parameters lose their value
/// - Long key-like tokens are replaced wholesale
pub fn redact_error_message(message: &str) -> String {
    let redacted = URL_WITH_CREDS.replace_all(message, "$1[REDACTED]@");
    let redacted = KEY_QUERY_PARAM.replace_all(&redacted, "${1}[REDACTED]");
    let redacted = POTENTIAL_KEY.replace_all(&redacted, "[REDACTED_KEY]");
    redacted.to_string()
}
