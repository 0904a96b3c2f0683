use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `ReportError` is returned only for request-level problems: configuration
/// that cannot be resolved, a model endpoint that cannot be constructed at
/// start-up, assets that cannot be read, or a document that cannot be written.
/// Failures inside individual generation stages never surface here; each
/// generator degrades to its own fallback instead.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | Asset errors |
/// | 70 | Model endpoint unavailable |
/// | 1 | Other errors |
///
/// # Example
///
/// ```rust
/// use reportgen_utils::error::{ConfigError, ReportError};
/// use reportgen_utils::exit_codes::ExitCode;
///
/// let err = ReportError::Config(ConfigError::MissingRequired("title".to_string()));
/// assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
/// assert!(err.display_for_user().contains("Suggestions:"));
/// ```
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Workspace error at {path}: {reason}")]
    Workspace { path: String, reason: String },
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ModelProvider,
    FileSystem,
    ResourceLimits,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::ModelProvider => write!(f, "Model Provider"),
            Self::FileSystem => write!(f, "File System"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [llm], [generation], [compiler] and [output] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => {
                Some("Some values are required before a report can be generated.".to_string())
            }
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::DiscoveryFailed { .. } => Some(
                "reportgen searches upward from the current directory for .reportgen/config.toml."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .reportgen/config.toml".to_string(),
                "Remove unknown keys or fix mistyped values".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!(
                "Provide '{key}' on the command line or in the configuration file"
            )],
            Self::InvalidValue { key, .. } => vec![
                format!("Correct the value of '{key}'"),
                "Run 'reportgen doctor' to validate the effective configuration".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Pass --config <path> to use an explicit configuration file".to_string(),
                "Check that the current directory is readable".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors that can occur during LLM backend operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// The provider refused the prompt on policy grounds
    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Whether another attempt at the same prompt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ProviderQuota(_) | Self::ProviderOutage(_) | Self::Timeout { .. }
        )
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {:?}", duration)
            }
            Self::BudgetExceeded { limit, attempted } => {
                format!(
                    "LLM budget exceeded: attempted {} calls, limit is {}",
                    attempted, limit
                )
            }
            Self::ContentBlocked(msg) => format!("LLM provider blocked the prompt: {msg}"),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => Some(
                "Transport errors occur when the LLM endpoint cannot be reached or returns an unreadable body."
                    .to_string(),
            ),
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderQuota(_) => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => Some(
                "Timeouts occur when a model call takes longer than the configured limit."
                    .to_string(),
            ),
            Self::BudgetExceeded { .. } => {
                Some("The call budget caps the number of model calls per process.".to_string())
            }
            Self::ContentBlocked(_) => Some(
                "The provider's safety filter rejected the prompt.".to_string(),
            ),
            Self::Misconfiguration(_) => Some(
                "Configuration errors indicate missing or invalid LLM provider settings."
                    .to_string(),
            ),
            Self::Unsupported(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) => vec![
                "Verify network connectivity to the provider".to_string(),
                "Try running with --verbose to see detailed error information".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the required API key environment variable is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Consider configuring a fallback provider in [llm]".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase [llm] request_timeout_secs".to_string(),
                "Check your internet connection".to_string(),
            ],
            Self::BudgetExceeded { .. } => vec![
                "Raise [generation] call_budget or REPORTGEN_CALL_BUDGET".to_string(),
            ],
            Self::ContentBlocked(_) => vec![
                "Rephrase the report query".to_string(),
            ],
            Self::Misconfiguration(_) => vec![
                "Check the [llm] section of .reportgen/config.toml".to_string(),
                "Run 'reportgen doctor' to inspect provider settings".to_string(),
            ],
            Self::Unsupported(_) => vec![
                "Use one of the supported providers: gemini, anthropic, openrouter".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) | Self::BudgetExceeded { .. } => ErrorCategory::ResourceLimits,
            Self::ContentBlocked(_) => ErrorCategory::Validation,
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Timeout { .. } => {
                ErrorCategory::ModelProvider
            }
        }
    }
}

/// Errors for user-supplied assets (logo, figure)
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {path}")]
    NotFound { path: String },

    #[error("Asset could not be copied from {path}: {reason}")]
    CopyFailed { path: String, reason: String },
}

impl UserFriendlyError for AssetError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { path } => format!("The file '{path}' does not exist"),
            Self::CopyFailed { path, reason } => {
                format!("Could not copy '{path}' into the report workspace: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some("Logos and figures are copied next to the generated document before typesetting.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Check the path passed to --logo or --figure".to_string(),
            "Verify the file is readable by the current user".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::FileSystem
    }
}

impl UserFriendlyError for ReportError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Asset(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
            Self::Workspace { path, reason } => {
                format!("Could not prepare the report workspace at {path}: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Llm(err) => err.context(),
            Self::Asset(err) => err.context(),
            Self::Io(_) | Self::Workspace { .. } => Some(
                "This usually indicates a permissions issue or disk space problem.".to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
            Self::Asset(err) => err.suggestions(),
            Self::Io(_) | Self::Workspace { .. } => vec![
                "Check write permissions for the output directory".to_string(),
                "Ensure sufficient disk space is available".to_string(),
                "Use --output-dir to choose a different location".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Llm(err) => err.category(),
            Self::Asset(_) | Self::Io(_) | Self::Workspace { .. } => ErrorCategory::FileSystem,
        }
    }
}

impl ReportError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(context) = self.context() {
            output.push_str(&format!("\nContext: {}\n", context));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {}\n", suggestion));
            }
        }

        output
    }

    /// Map this error to the appropriate CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            ReportError::Config(_) => ExitCode::CLI_ARGS,
            ReportError::Asset(_) => ExitCode::ASSET_ERROR,
            ReportError::Llm(llm_err) => match llm_err {
                LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => {
                    ExitCode::MODEL_UNAVAILABLE
                }
                LlmError::ProviderAuth(_) => ExitCode::MODEL_UNAVAILABLE,
                _ => ExitCode::INTERNAL,
            },
            _ => ExitCode::INTERNAL,
        }
    }
}
