//! Anthropic Messages API backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::config::Config;
use crate::http_client::HttpParams;
use crate::provider::{ProviderEndpoint, api_key_from_env};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    endpoint: ProviderEndpoint,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// `LlmError::Misconfiguration` when no key is set or the HTTP client
    /// cannot be built.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        Self::from_config_with_lookup(config, |k| std::env::var(k).ok())
    }

    fn from_config_with_lookup<F>(config: &Config, lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = config.llm.anthropic.clone().unwrap_or_default();
        let api_key = api_key_from_env(
            "Anthropic",
            "llm.anthropic",
            section.api_key_env.as_deref(),
            &["ANTHROPIC_API_KEY"],
            lookup,
        )?;

        let endpoint = ProviderEndpoint::new(
            "anthropic",
            api_key,
            section.base_url.unwrap_or_else(|| MESSAGES_URL.to_string()),
            config.model_for_provider("anthropic"),
            HttpParams {
                max_tokens: section.max_tokens.unwrap_or(4096),
                temperature: section.temperature.unwrap_or(0.7),
            },
        )?;
        Ok(Self { endpoint })
    }

    /// System text goes in the top-level `system` field, joined by blank lines.
    fn split_system(messages: &[Message]) -> (Option<String>, Vec<Turn<'_>>) {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let turns = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::System => return None,
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                Some(Turn {
                    role,
                    content: &m.content,
                })
            })
            .collect();

        ((!system.is_empty()).then(|| system.join("\n\n")), turns)
    }
}

/// Concatenated text blocks, or why there are none.
fn reply_text(reply: &Reply) -> Result<String, LlmError> {
    let text: String = reply
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    if !text.is_empty() {
        return Ok(text);
    }
    match reply.stop_reason.as_deref() {
        Some("refusal") => Err(LlmError::ContentBlocked(
            "Anthropic declined to answer the prompt".to_string(),
        )),
        _ => Err(LlmError::Transport(
            "Anthropic response had no text blocks".to_string(),
        )),
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.endpoint.resolve(&inv);
        let (system, messages) = Self::split_system(&inv.messages);

        debug!(
            provider = self.endpoint.name(),
            model = %model,
            max_tokens = params.max_tokens,
            "Sending prompt"
        );

        let body = MessagesRequest {
            model: &model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
        };
        let request = self
            .endpoint
            .post(&self.endpoint.base_url)
            .header("x-api-key", &self.endpoint.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let reply: Reply = self.endpoint.send(request, inv.timeout).await?;
        let text = reply_text(&reply)?;

        let mut result = LlmResult::new(text, self.endpoint.name(), model);
        if let Some(usage) = reply.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<Turn<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    content: Vec<Block>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
