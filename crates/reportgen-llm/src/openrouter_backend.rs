//! OpenRouter backend (OpenAI-compatible chat completions).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::config::Config;
use crate::http_client::HttpParams;
use crate::provider::{ProviderEndpoint, api_key_from_env};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

const COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Sent as `X-Title` so requests are attributed to this tool.
const APP_TITLE: &str = "reportgen";

#[derive(Clone)]
pub(crate) struct OpenRouterBackend {
    endpoint: ProviderEndpoint,
}

impl OpenRouterBackend {
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
        let section = config.llm.openrouter.clone().unwrap_or_default();
        let api_key = api_key_from_env(
            "OpenRouter",
            "llm.openrouter",
            section.api_key_env.as_deref(),
            &["OPENROUTER_API_KEY"],
            lookup,
        )?;

        let endpoint = ProviderEndpoint::new(
            "openrouter",
            api_key,
            section
                .base_url
                .unwrap_or_else(|| COMPLETIONS_URL.to_string()),
            config.model_for_provider("openrouter"),
            HttpParams {
                max_tokens: section.max_tokens.unwrap_or(4096),
                temperature: section.temperature.unwrap_or(0.7),
            },
        )?;
        Ok(Self { endpoint })
    }
}

fn chat_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
    messages
        .iter()
        .map(|m| ChatMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &m.content,
        })
        .collect()
}

fn completion_text(completion: Completion) -> Result<String, LlmError> {
    let choice = completion.choices.into_iter().next().ok_or_else(|| {
        LlmError::Transport("OpenRouter response had no choices".to_string())
    })?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(LlmError::ContentBlocked(
            "OpenRouter upstream applied a content filter".to_string(),
        ));
    }
    choice
        .message
        .content
        .filter(|text| !text.is_empty())
        .ok_or_else(|| LlmError::Transport("OpenRouter choice had no content".to_string()))
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.endpoint.resolve(&inv);

        debug!(
            provider = self.endpoint.name(),
            model = %model,
            max_tokens = params.max_tokens,
            "Sending prompt"
        );

        let body = ChatRequest {
            model: &model,
            messages: chat_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };
        let request = self
            .endpoint
            .post(&self.endpoint.base_url)
            .bearer_auth(&self.endpoint.api_key)
            .header("X-Title", APP_TITLE)
            .json(&body);

        let mut completion: Completion = self.endpoint.send(request, inv.timeout).await?;
        let usage = completion.usage.take();
        let text = completion_text(completion)?;

        let mut result = LlmResult::new(text, self.endpoint.name(), model);
        if let Some(usage) = usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }
        Ok(result)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(json: &str) -> Completion {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_roles_mapped_in_order() {
        let messages = vec![
            Message::system("Be brief"),
            Message::user("Hello"),
            Message::assistant("Hi"),
        ];
        let roles: Vec<&str> = chat_messages(&messages).iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user", "assistant"]);
    }

    #[test]
    fn test_first_choice_text() {
        let c = completion(
            r#"{"choices":[{"message":{"role":"assistant","content":"ok"},"finish_reason":"stop"}]}"#,
        );
        assert!(c.usage.is_none());
        assert_eq!(completion_text(c).unwrap(), "ok");
    }

    #[test]
    fn test_content_filter_is_blocked() {
        let c = completion(
            r#"{"choices":[{"message":{"content":null},"finish_reason":"content_filter"}]}"#,
        );
        assert!(matches!(completion_text(c), Err(LlmError::ContentBlocked(_))));
    }

    #[test]
    fn test_no_choices_is_transport_error() {
        let c = completion(r#"{"choices":[]}"#);
        assert!(matches!(completion_text(c), Err(LlmError::Transport(_))));
    }

    #[test]
    fn test_default_model_comes_from_config() {
        let config = Config::minimal_for_testing();
        let backend =
            OpenRouterBackend::from_config_with_lookup(&config, |_| Some("key".to_string()))
                .unwrap();
        let inv = LlmInvocation::new("", std::time::Duration::from_secs(5), vec![]);
        assert_eq!(
            backend.endpoint.resolve(&inv).0,
            crate::config::DEFAULT_OPENROUTER_MODEL
        );
    }
}
