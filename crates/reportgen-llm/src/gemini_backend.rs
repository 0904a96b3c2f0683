//! Gemini HTTP backend implementation
//!
//! Talks to the `generateContent` REST endpoint of the Generative Language API.
//! This is the default provider.

use crate::LlmError;
use crate::config::Config;
use crate::http_client::HttpParams;
use crate::provider::{ProviderEndpoint, api_key_from_env};
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default API root; the model and method are appended per request.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Key variables consulted when no `api_key_env` is configured, in order.
const DEFAULT_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Finish reasons that mean the provider withheld the answer on policy grounds.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

#[derive(Clone)]
pub(crate) struct GeminiBackend {
    endpoint: ProviderEndpoint,
}

impl GeminiBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if no API key can be found or the
    /// HTTP client cannot be constructed.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        Self::from_config_with_lookup(config, |k| std::env::var(k).ok())
    }

    fn from_config_with_lookup<F>(config: &Config, lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = config.llm.gemini.clone().unwrap_or_default();
        let api_key = api_key_from_env(
            "Gemini",
            "llm.gemini",
            section.api_key_env.as_deref(),
            DEFAULT_KEY_VARS,
            lookup,
        )?;

        let endpoint = ProviderEndpoint::new(
            "gemini",
            api_key,
            section
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            config.model_for_provider("gemini"),
            HttpParams {
                max_tokens: section.max_tokens.unwrap_or(8192),
                temperature: section.temperature.unwrap_or(0.7),
            },
        )?;
        Ok(Self { endpoint })
    }

    fn method_url(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.endpoint.base_url, model)
    }

    /// Split system messages into `systemInstruction`; the rest become
    /// `contents` with Gemini's `user` / `model` roles.
    fn convert_messages(messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::System => {
                    system_parts.push(GeminiPart {
                        text: msg.content.clone(),
                    });
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "model",
            };
            contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts: vec![GeminiPart {
                    text: msg.content.clone(),
                }],
            });
        }

        let system = (!system_parts.is_empty()).then(|| GeminiContent {
            role: None,
            parts: system_parts,
        });

        (system, contents)
    }
}

/// Interpret a parsed response: text, a block, or a malformed body.
fn extract_text(body: &GeminiResponse) -> Result<String, LlmError> {
    if let Some(reason) = body
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(LlmError::ContentBlocked(format!(
            "prompt blocked by provider: {reason}"
        )));
    }

    let candidate = body.candidates.first().ok_or_else(|| {
        LlmError::Transport("Gemini response contained no candidates".to_string())
    })?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref()
            && BLOCKING_FINISH_REASONS.contains(&reason)
        {
            return Err(LlmError::ContentBlocked(format!(
                "response withheld by provider: {reason}"
            )));
        }
        return Err(LlmError::Transport(
            "Gemini response missing text content".to_string(),
        ));
    }

    Ok(text)
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.endpoint.resolve(&inv);

        debug!(
            provider = self.endpoint.name(),
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Sending prompt"
        );

        let (system_instruction, contents) = Self::convert_messages(&inv.messages);

        let request_body = GeminiRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            },
        };

        let request = self
            .endpoint
            .post(&self.method_url(&model))
            .header("x-goog-api-key", &self.endpoint.api_key)
            .json(&request_body);

        let response_body: GeminiResponse = self.endpoint.send(request, inv.timeout).await?;

        let text = extract_text(&response_body)?;

        let mut result = LlmResult::new(text, self.endpoint.name(), model);
        if let Some(usage) = &response_body.usage_metadata {
            result = result.with_tokens(
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
            );
        }
        if let Some(reason) = response_body
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
        {
            result = result.with_extension("finish_reason", serde_json::Value::String(reason));
        }

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}
