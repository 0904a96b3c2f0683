use std::path::PathBuf;
use std::time::Duration;

use reportgen_utils::error::ReportError;

use super::{Config, ConfigSource, GeminiConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding the generator without relying on environment
    /// variables or config files.
    ///
    /// ```rust
    /// use reportgen_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .output_dir("/tmp/reports")
    ///     .compiler_passes(2)
    ///     .section_delay(Duration::ZERO)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.compiler_passes(), 2);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    provider: Option<String>,
    model: Option<String>,
    output_dir: Option<PathBuf>,
    max_attempts: Option<u32>,
    backoff_base: Option<Duration>,
    section_delay: Option<Duration>,
    call_budget: Option<u32>,
    compiler_program: Option<String>,
    compiler_passes: Option<u32>,
    compiler_timeout: Option<Duration>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Model for the Gemini provider.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = Some(base);
        self
    }

    #[must_use]
    pub fn section_delay(mut self, delay: Duration) -> Self {
        self.section_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn call_budget(mut self, budget: u32) -> Self {
        self.call_budget = Some(budget);
        self
    }

    #[must_use]
    pub fn compiler_program(mut self, program: impl Into<String>) -> Self {
        self.compiler_program = Some(program.into());
        self
    }

    #[must_use]
    pub fn compiler_passes(mut self, passes: u32) -> Self {
        self.compiler_passes = Some(passes);
        self
    }

    #[must_use]
    pub fn compiler_timeout(mut self, timeout: Duration) -> Self {
        self.compiler_timeout = Some(timeout);
        self
    }

    /// Build the configuration, applying validation.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if any value is out of range.
    pub fn build(self) -> Result<Config, ReportError> {
        let mut config = Config::defaults();
        let src = ConfigSource::Programmatic;
        let mark = |config: &mut Config, key: &str| {
            config.source_attribution.insert(key.to_string(), src.clone());
        };

        if let Some(provider) = self.provider {
            config.llm.provider = Some(provider);
            mark(&mut config, "llm_provider");
        }
        if let Some(model) = self.model {
            config.llm.gemini.get_or_insert_with(GeminiConfig::default).model = Some(model);
            mark(&mut config, "llm_model");
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = Some(dir);
            mark(&mut config, "output_dir");
        }
        if let Some(attempts) = self.max_attempts {
            config.generation.max_attempts = Some(attempts);
            mark(&mut config, "max_attempts");
        }
        if let Some(base) = self.backoff_base {
            config.generation.backoff_base_ms = Some(base.as_millis() as u64);
            mark(&mut config, "backoff_base_ms");
        }
        if let Some(delay) = self.section_delay {
            config.generation.section_delay_ms = Some(delay.as_millis() as u64);
            mark(&mut config, "section_delay_ms");
        }
        if let Some(budget) = self.call_budget {
            config.generation.call_budget = Some(budget);
            mark(&mut config, "call_budget");
        }
        if let Some(program) = self.compiler_program {
            config.compiler.program = Some(program);
            mark(&mut config, "compiler_program");
        }
        if let Some(passes) = self.compiler_passes {
            config.compiler.passes = Some(passes);
            mark(&mut config, "compiler_passes");
        }
        if let Some(timeout) = self.compiler_timeout {
            config.compiler.timeout_secs = Some(timeout.as_secs());
            mark(&mut config, "compiler_timeout_secs");
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_attributes_programmatic_source() {
        let config = Config::builder()
            .provider("anthropic")
            .compiler_passes(1)
            .build()
            .unwrap();

        assert_eq!(config.provider(), "anthropic");
        assert_eq!(
            config.source_attribution.get("compiler_passes"),
            Some(&ConfigSource::Programmatic)
        );
        assert_eq!(
            config.source_attribution.get("compiler_program"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn test_builder_validates() {
        let result = Config::builder().compiler_passes(9).build();
        assert!(result.is_err(), "passes above 5 must be rejected");
    }

    #[test]
    fn test_minimal_for_testing_has_no_delays() {
        let config = Config::minimal_for_testing();
        assert!(config.backoff_base().is_zero());
        assert!(config.section_delay().is_zero());
    }
}
