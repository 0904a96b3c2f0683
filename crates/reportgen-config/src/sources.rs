use std::collections::BTreeMap;

use reportgen_utils::types::ConfigValue;
use serde_json::Value;

use super::{Config, ConfigSource};

impl Config {
    fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }

    /// Get effective configuration as key-value pairs with source attribution.
    ///
    /// API keys are never included; only the names of the variables they are
    /// read from.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, ConfigValue> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: Value, source: ConfigSource| {
            config.insert(key.to_string(), ConfigValue { value, source });
        };

        let provider = self.provider().to_string();
        add("llm_provider", Value::from(provider.clone()), self.source_of("llm_provider"));
        add(
            "llm_model",
            Value::from(self.model_for_provider(&provider)),
            self.source_of("llm_model"),
        );
        if let Some(fallback) = &self.llm.fallback_provider {
            add(
                "fallback_provider",
                Value::from(fallback.clone()),
                self.source_of("fallback_provider"),
            );
        }
        add(
            "request_timeout_secs",
            Value::from(self.request_timeout().as_secs()),
            self.source_of("request_timeout_secs"),
        );
        add(
            "max_attempts",
            Value::from(self.max_attempts()),
            self.source_of("max_attempts"),
        );
        add(
            "min_response_length",
            Value::from(self.min_response_length()),
            self.source_of("min_response_length"),
        );
        add(
            "backoff_base_ms",
            Value::from(self.backoff_base().as_millis() as u64),
            self.source_of("backoff_base_ms"),
        );
        add(
            "section_delay_ms",
            Value::from(self.section_delay().as_millis() as u64),
            self.source_of("section_delay_ms"),
        );
        if let Some(budget) = self.generation.call_budget {
            add("call_budget", Value::from(budget), self.source_of("call_budget"));
        }
        add(
            "compiler_program",
            Value::from(self.compiler_program()),
            self.source_of("compiler_program"),
        );
        add(
            "compiler_passes",
            Value::from(self.compiler_passes()),
            self.source_of("compiler_passes"),
        );
        add(
            "compiler_timeout_secs",
            Value::from(self.compiler_timeout().as_secs()),
            self.source_of("compiler_timeout_secs"),
        );
        add(
            "min_output_bytes",
            Value::from(self.min_output_bytes()),
            self.source_of("min_output_bytes"),
        );
        add(
            "output_dir",
            Value::from(self.output_dir().display().to_string()),
            self.source_of("output_dir"),
        );
        add(
            "default_color",
            Value::from(self.default_color().to_string()),
            self.source_of("default_color"),
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_reports_sources() {
        let mut config = Config::defaults();
        config.compiler.passes = Some(2);
        config
            .source_attribution
            .insert("compiler_passes".to_string(), ConfigSource::Cli);

        let effective = config.effective_config();

        let passes = &effective["compiler_passes"];
        assert_eq!(passes.value, Value::from(2));
        assert_eq!(passes.source, ConfigSource::Cli);

        assert_eq!(effective["llm_model"].value, Value::from("gemini-2.0-flash"));
        assert_eq!(effective["llm_model"].source, ConfigSource::Default);
        assert!(!effective.contains_key("call_budget"));
    }
}
