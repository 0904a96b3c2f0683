use reportgen_utils::error::{ConfigError, ReportError};

use super::{Config, RgbColor, SUPPORTED_PROVIDERS};

fn invalid(key: &str, value: impl Into<String>) -> ReportError {
    ReportError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ReportError> {
        let provider = self.provider();
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            return Err(invalid(
                "llm.provider",
                format!(
                    "'{provider}' is not valid. Must be one of: {}",
                    SUPPORTED_PROVIDERS.join(", ")
                ),
            ));
        }

        if let Some(fallback) = self.llm.fallback_provider.as_deref() {
            if !SUPPORTED_PROVIDERS.contains(&fallback) {
                return Err(invalid(
                    "llm.fallback_provider",
                    format!(
                        "'{fallback}' is not valid. Must be one of: {}",
                        SUPPORTED_PROVIDERS.join(", ")
                    ),
                ));
            }
            if fallback == provider {
                return Err(invalid(
                    "llm.fallback_provider",
                    "must differ from llm.provider",
                ));
            }
        }

        if let Some(timeout) = self.llm.request_timeout_secs
            && !(5..=3600).contains(&timeout)
        {
            return Err(invalid(
                "llm.request_timeout_secs",
                "must be between 5 and 3600 seconds",
            ));
        }

        if let Some(attempts) = self.generation.max_attempts
            && !(1..=10).contains(&attempts)
        {
            return Err(invalid("generation.max_attempts", "must be between 1 and 10"));
        }

        if let Some(passes) = self.compiler.passes
            && !(1..=5).contains(&passes)
        {
            return Err(invalid("compiler.passes", "must be between 1 and 5"));
        }

        if let Some(timeout) = self.compiler.timeout_secs
            && !(5..=3600).contains(&timeout)
        {
            return Err(invalid(
                "compiler.timeout_secs",
                "must be between 5 and 3600 seconds",
            ));
        }

        if let Some(program) = &self.compiler.program
            && program.trim().is_empty()
        {
            return Err(invalid("compiler.program", "must not be empty"));
        }

        if let Some(color) = &self.output.default_color
            && let Err(e) = color.parse::<RgbColor>()
        {
            return Err(invalid("output.default_color", e.to_string()));
        }

        Ok(())
    }
}
