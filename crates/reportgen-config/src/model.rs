use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use reportgen_utils::types::ConfigSource;

/// Providers the model-call layer knows how to construct.
pub const SUPPORTED_PROVIDERS: &[&str] = &["gemini", "anthropic", "openrouter"];

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_COLOR: &str = "0, 51, 102";

/// Configuration for reportgen.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > environment > config file > built-in defaults.
///
/// # Discovery
///
/// [`Config::discover()`] searches for `.reportgen/config.toml` upward from the
/// current directory, stopping at a repository root.
///
/// # Configuration File Format
///
/// ```toml
/// [llm]
/// provider = "gemini"
/// request_timeout_secs = 120
///
/// [llm.gemini]
/// model = "gemini-2.0-flash"
///
/// [generation]
/// max_attempts = 3
/// section_delay_ms = 2000
///
/// [compiler]
/// program = "pdflatex"
/// passes = 3
///
/// [output]
/// dir = "build"
/// default_color = "0, 51, 102"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Model provider configuration.
    pub llm: LlmConfig,
    /// Retry, pacing and budget settings for model calls.
    pub generation: GenerationConfig,
    /// Typesetter invocation settings.
    pub compiler: CompilerConfig,
    /// Where reports are written.
    pub output: OutputConfig,
    /// Source attribution for each setting (for doctor display).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub fallback_provider: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub gemini: Option<GeminiConfig>,
    pub anthropic: Option<AnthropicConfig>,
    pub openrouter: Option<OpenRouterConfig>,
}

/// Gemini `generateContent` provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Anthropic HTTP provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnthropicConfig {
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// OpenRouter HTTP provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OpenRouterConfig {
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub budget: Option<u32>,
}

/// Retry and pacing configuration for model calls
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Attempts per prompt before giving up.
    pub max_attempts: Option<u32>,
    /// Responses shorter than this (after trimming) count as failed attempts.
    pub min_response_length: Option<usize>,
    /// Attempt `n` waits `backoff_base_ms * 2^n` before retrying.
    pub backoff_base_ms: Option<u64>,
    /// Pause between consecutive section calls.
    pub section_delay_ms: Option<u64>,
    /// Hard cap on model calls for the whole process.
    pub call_budget: Option<u32>,
}

/// Typesetter configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompilerConfig {
    pub program: Option<String>,
    pub passes: Option<u32>,
    pub timeout_secs: Option<u64>,
    /// A PDF at or below this size is treated as a failed build.
    pub min_output_bytes: Option<u64>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
    pub default_color: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            min_response_length: Some(10),
            backoff_base_ms: Some(1000),
            section_delay_ms: Some(2000),
            call_budget: None,
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: Some("pdflatex".to_string()),
            passes: Some(3),
            timeout_secs: Some(180),
            min_output_bytes: Some(1024),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("build")),
            default_color: Some(DEFAULT_COLOR.to_string()),
        }
    }
}

impl Config {
    /// Built-in defaults with every key attributed to [`ConfigSource::Default`].
    #[must_use]
    pub fn defaults() -> Self {
        let mut source_attribution = HashMap::new();
        for key in [
            "llm_provider",
            "request_timeout_secs",
            "max_attempts",
            "min_response_length",
            "backoff_base_ms",
            "section_delay_ms",
            "compiler_program",
            "compiler_passes",
            "compiler_timeout_secs",
            "min_output_bytes",
            "output_dir",
            "default_color",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        Self {
            llm: LlmConfig {
                provider: Some(DEFAULT_PROVIDER.to_string()),
                request_timeout_secs: Some(120),
                ..LlmConfig::default()
            },
            generation: GenerationConfig::default(),
            compiler: CompilerConfig::default(),
            output: OutputConfig::default(),
            source_attribution,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs.unwrap_or(120))
    }

    /// Model name configured for `provider`, falling back to its built-in default.
    #[must_use]
    pub fn model_for_provider(&self, provider: &str) -> String {
        let configured = match provider {
            "gemini" => self.llm.gemini.as_ref().and_then(|c| c.model.clone()),
            "anthropic" => self.llm.anthropic.as_ref().and_then(|c| c.model.clone()),
            "openrouter" => self.llm.openrouter.as_ref().and_then(|c| c.model.clone()),
            _ => None,
        };
        configured.unwrap_or_else(|| {
            match provider {
                "anthropic" => DEFAULT_ANTHROPIC_MODEL,
                "openrouter" => DEFAULT_OPENROUTER_MODEL,
                _ => DEFAULT_GEMINI_MODEL,
            }
            .to_string()
        })
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.generation.max_attempts.unwrap_or(3)
    }

    #[must_use]
    pub fn min_response_length(&self) -> usize {
        self.generation.min_response_length.unwrap_or(10)
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.generation.backoff_base_ms.unwrap_or(1000))
    }

    #[must_use]
    pub fn section_delay(&self) -> Duration {
        Duration::from_millis(self.generation.section_delay_ms.unwrap_or(2000))
    }

    #[must_use]
    pub fn compiler_program(&self) -> &str {
        self.compiler.program.as_deref().unwrap_or("pdflatex")
    }

    #[must_use]
    pub fn compiler_passes(&self) -> u32 {
        self.compiler.passes.unwrap_or(3)
    }

    #[must_use]
    pub fn compiler_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.timeout_secs.unwrap_or(180))
    }

    #[must_use]
    pub fn min_output_bytes(&self) -> u64 {
        self.compiler.min_output_bytes.unwrap_or(1024)
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        self.output
            .dir
            .as_deref()
            .unwrap_or_else(|| Path::new("build"))
    }

    /// The configured default colour; falls back to the built-in one if unparsable.
    #[must_use]
    pub fn default_color(&self) -> RgbColor {
        self.output
            .default_color
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(RgbColor::DEFAULT)
    }
}

/// An `"R, G, B"` colour with 0..=255 channels.
///
/// ```rust
/// use reportgen_config::RgbColor;
///
/// let c: RgbColor = " 12,34 , 255".parse().unwrap();
/// assert_eq!(c.to_string(), "12,34,255");
/// assert!("300, 0, 0".parse::<RgbColor>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const DEFAULT: RgbColor = RgbColor { r: 0, g: 51, b: 102 };
}

/// Rejected colour string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColor(pub String);

impl fmt::Display for InvalidColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not an \"R, G, B\" colour with channels 0-255", self.0)
    }
}

impl std::error::Error for InvalidColor {}

impl FromStr for RgbColor {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels: Vec<&str> = s.split(',').map(str::trim).collect();
        let [r, g, b] = channels.as_slice() else {
            return Err(InvalidColor(s.to_string()));
        };
        let parse = |c: &str| c.parse::<u8>().map_err(|_| InvalidColor(s.to_string()));
        Ok(Self {
            r: parse(r)?,
            g: parse(g)?,
            b: parse(b)?,
        })
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}
