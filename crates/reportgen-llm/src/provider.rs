//! Pieces every HTTP provider needs: where to send, which key, which model.

use std::sync::Arc;
use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::LlmError;
use crate::http_client::{HttpClient, HttpParams};
use crate::types::LlmInvocation;

/// Find an API key.
///
/// A configured variable is the only one consulted; otherwise `defaults` are
/// tried in order. Blank values count as missing.
pub(crate) fn api_key_from_env<F>(
    provider: &str,
    section: &str,
    configured: Option<&str>,
    defaults: &[&str],
    lookup: F,
) -> Result<String, LlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let candidates: Vec<&str> = match configured {
        Some(var) => vec![var],
        None => defaults.to_vec(),
    };

    candidates
        .iter()
        .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| {
            let names = candidates
                .iter()
                .map(|v| format!("'{v}'"))
                .collect::<Vec<_>>()
                .join(" or ");
            LlmError::Misconfiguration(format!(
                "{provider} API key not found in environment variable {names}. \
                 Set it or configure a different api_key_env in [{section}]."
            ))
        })
}

/// Connection details shared by one backend's requests.
#[derive(Clone)]
pub(crate) struct ProviderEndpoint {
    name: &'static str,
    client: Arc<HttpClient>,
    pub base_url: String,
    pub api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl ProviderEndpoint {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        name: &'static str,
        api_key: String,
        base_url: String,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            name,
            client: Arc::new(HttpClient::new()?),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            default_params,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Model and sampling parameters for one call; an empty model name means
    /// the configured default.
    pub fn resolve(&self, inv: &LlmInvocation) -> (String, HttpParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };
        (model, self.default_params.resolve(&inv.metadata))
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send with the shared retry policy and decode the JSON body.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<T, LlmError> {
        let response = self
            .client
            .execute_with_retry(request, timeout, self.name)
            .await?;
        response.json::<T>().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse {} response: {e}", self.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_tried_in_order() {
        let key = api_key_from_env("Gemini", "llm.gemini", None, &["A", "B"], |k| {
            Some(format!("value-of-{k}"))
        })
        .unwrap();
        assert_eq!(key, "value-of-A");
    }

    #[test]
    fn test_blank_value_is_missing() {
        let err = api_key_from_env("Anthropic", "llm.anthropic", None, &["K"], |_| {
            Some("   ".to_string())
        })
        .unwrap_err();
        match err {
            LlmError::Misconfiguration(msg) => {
                assert!(msg.starts_with("Anthropic API key"));
                assert!(msg.contains("'K'"));
                assert!(msg.contains("[llm.anthropic]"));
            }
            other => panic!("expected Misconfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_prefers_invocation_model() {
        let endpoint = ProviderEndpoint::new(
            "test",
            "k".to_string(),
            "http://localhost/".to_string(),
            "default-model".to_string(),
            HttpParams::default(),
        )
        .unwrap();
        assert_eq!(endpoint.base_url, "http://localhost");

        let inv = LlmInvocation::new("", Duration::from_secs(1), vec![]);
        assert_eq!(endpoint.resolve(&inv).0, "default-model");

        let inv = LlmInvocation::new("other", Duration::from_secs(1), vec![])
            .with_metadata("temperature", serde_json::json!(0.1));
        let (model, params) = endpoint.resolve(&inv);
        assert_eq!(model, "other");
        assert!((params.temperature - 0.1).abs() < f32::EPSILON);
    }
}
