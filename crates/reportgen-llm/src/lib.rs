//! Model backend abstraction for multi-provider support
//!
//! Every provider implements [`LlmBackend`]; [`ModelClient`] layers retry and
//! failure classification on top and exposes the [`TextGenerator`] interface
//! the report generators consume.

mod anthropic_backend;
mod budgeted_backend;
mod gemini_backend;
mod http_client;
mod model_client;
mod openrouter_backend;
mod provider;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use reportgen_config as config;

pub use budgeted_backend::BudgetedBackend;
pub use http_client::redact_error_message;
pub use model_client::{ModelClient, RetryPolicy};
pub use reportgen_utils::error::LlmError;
pub use types::{
    GenerationFailure, LlmBackend, LlmFallbackInfo, LlmInvocation, LlmResult, Message, Role,
    TextGenerator,
};

pub(crate) use anthropic_backend::AnthropicBackend;
pub(crate) use gemini_backend::GeminiBackend;
pub(crate) use openrouter_backend::OpenRouterBackend;

use budgeted_backend::DEFAULT_OPENROUTER_BUDGET;
use config::Config;
use tracing::{info, warn};

/// Construct a backend for a specific provider, without fallback handling.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown and
/// `LlmError::Misconfiguration` if provider settings or credentials are missing.
fn construct_backend_for_provider(
    provider: &str,
    config: &Config,
) -> Result<Box<dyn LlmBackend>, LlmError> {
    match provider {
        "gemini" => Ok(Box::new(GeminiBackend::new_from_config(config)?)),
        "anthropic" => Ok(Box::new(AnthropicBackend::new_from_config(config)?)),
        "openrouter" => {
            let backend = OpenRouterBackend::new_from_config(config)?;
            let limit = config
                .llm
                .openrouter
                .as_ref()
                .and_then(|or| or.budget)
                .unwrap_or(DEFAULT_OPENROUTER_BUDGET);
            Ok(Box::new(BudgetedBackend::new(Box::new(backend), limit)))
        }
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{}'. Supported providers: {}.",
            unknown,
            config::SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

/// Create a backend from configuration, returning fallback metadata when used.
///
/// If the primary provider cannot be constructed and `[llm] fallback_provider`
/// is set, the fallback is tried; when both fail the primary error is returned.
/// A `[generation] call_budget` wraps whichever backend is chosen.
///
/// # Errors
///
/// See [`construct_backend_for_provider`].
pub fn from_config_with_fallback(
    config: &Config,
) -> Result<(Box<dyn LlmBackend>, Option<LlmFallbackInfo>), LlmError> {
    let provider = config.provider();

    let (backend, fallback_info) = match construct_backend_for_provider(provider, config) {
        Ok(backend) => (backend, None),
        Err(primary_error) => {
            let Some(fallback_provider) = config.llm.fallback_provider.as_deref() else {
                return Err(primary_error);
            };
            let reason = redact_error_message(&primary_error.to_string());
            warn!(
                primary = provider,
                fallback = fallback_provider,
                reason = %reason,
                "Primary provider unavailable, trying fallback"
            );

            match construct_backend_for_provider(fallback_provider, config) {
                Ok(backend) => (
                    backend,
                    Some(LlmFallbackInfo {
                        primary_provider: provider.to_string(),
                        fallback_provider: fallback_provider.to_string(),
                        reason,
                    }),
                ),
                Err(fallback_error) => {
                    warn!(
                        fallback = fallback_provider,
                        error = %redact_error_message(&fallback_error.to_string()),
                        "Fallback provider also unavailable"
                    );
                    return Err(primary_error);
                }
            }
        }
    };

    let backend = match config.generation.call_budget {
        Some(limit) => {
            info!(limit = limit, "Applying process-wide model call budget");
            Box::new(BudgetedBackend::new(backend, limit)) as Box<dyn LlmBackend>
        }
        None => backend,
    };

    Ok((backend, fallback_info))
}

/// Create a backend from configuration, discarding fallback metadata.
///
/// # Errors
///
/// See [`from_config_with_fallback`].
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    let (backend, _fallback_info) = from_config_with_fallback(config)?;
    Ok(backend)
}

/// Build the retrying [`ModelClient`] for the configured provider.
///
/// The model passed to the client is left empty so that the chosen backend
/// (primary or fallback) uses its own configured model.
///
/// # Errors
///
/// See [`from_config_with_fallback`].
pub fn client_from_config(
    config: &Config,
) -> Result<(ModelClient, Option<LlmFallbackInfo>), LlmError> {
    let (backend, fallback) = from_config_with_fallback(config)?;
    Ok((ModelClient::from_config(backend, "", config), fallback))
}

#[cfg(test)]
mod factory_tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    // Single global lock for all tests that touch environment variables.
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let mut config = Config::minimal_for_testing();
        config.llm.provider = Some("invalid-provider".to_string());

        match from_config(&config) {
            Err(LlmError::Unsupported(msg)) => {
                assert!(msg.contains("invalid-provider"));
                assert!(msg.contains("gemini"));
            }
            _ => panic!("Expected LlmError::Unsupported for invalid-provider"),
        }
    }

    #[test]
    fn test_missing_gemini_key_is_misconfiguration() {
        let _guard = env_guard();
        let mut config = Config::minimal_for_testing();
        config.llm.gemini = Some(config::GeminiConfig {
            api_key_env: Some("REPORTGEN_TEST_UNSET_GEMINI_KEY".to_string()),
            ..Default::default()
        });

        assert!(matches!(
            from_config(&config),
            Err(LlmError::Misconfiguration(_))
        ));
    }

    #[test]
    fn test_fallback_used_when_primary_cannot_be_built() {
        let _guard = env_guard();
        // SAFETY: env mutation is serialised by ENV_LOCK and undone below.
        unsafe {
            env::set_var("REPORTGEN_TEST_FALLBACK_ANTHROPIC_KEY", "test-key");
        }

        let mut config = Config::minimal_for_testing();
        config.llm.gemini = Some(config::GeminiConfig {
            api_key_env: Some("REPORTGEN_TEST_UNSET_GEMINI_KEY".to_string()),
            ..Default::default()
        });
        config.llm.fallback_provider = Some("anthropic".to_string());
        config.llm.anthropic = Some(config::AnthropicConfig {
            api_key_env: Some("REPORTGEN_TEST_FALLBACK_ANTHROPIC_KEY".to_string()),
            ..Default::default()
        });

        let result = from_config_with_fallback(&config);

        unsafe {
            env::remove_var("REPORTGEN_TEST_FALLBACK_ANTHROPIC_KEY");
        }

        let (_backend, info) = result.expect("fallback should be constructed");
        let info = info.expect("fallback info should be reported");
        assert_eq!(info.primary_provider, "gemini");
        assert_eq!(info.fallback_provider, "anthropic");
        assert!(info.reason.contains("REPORTGEN_TEST_UNSET_GEMINI_KEY"));
    }

    #[test]
    fn test_primary_error_returned_when_fallback_fails_too() {
        let _guard = env_guard();
        let mut config = Config::minimal_for_testing();
        config.llm.gemini = Some(config::GeminiConfig {
            api_key_env: Some("REPORTGEN_TEST_UNSET_GEMINI_KEY".to_string()),
            ..Default::default()
        });
        config.llm.fallback_provider = Some("openrouter".to_string());
        config.llm.openrouter = Some(config::OpenRouterConfig {
            api_key_env: Some("REPORTGEN_TEST_UNSET_OPENROUTER_KEY".to_string()),
            ..Default::default()
        });

        match from_config_with_fallback(&config) {
            Err(LlmError::Misconfiguration(msg)) => assert!(msg.contains("Gemini")),
            Err(other) => panic!("expected the primary Misconfiguration, got {other:?}"),
            Ok(_) => panic!("expected the primary Misconfiguration, got a backend"),
        }
    }
}
