//! Shared serializable types used across reportgen crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Source of a configuration value.
///
/// Precedence: CLI arguments > environment > config file > programmatic
/// overrides > built-in defaults.
///
/// ```rust
/// use reportgen_utils::types::ConfigSource;
///
/// let json = serde_json::to_string(&ConfigSource::Env).unwrap();
/// assert_eq!(json, r#""env""#);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value read from a `REPORTGEN_*` or provider environment variable.
    Env,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// A configuration value paired with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue {
    pub value: serde_json::Value,
    pub source: ConfigSource,
}

/// Doctor output structure for JSON emission (schema v1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorOutput {
    /// Schema version for this doctor format
    pub schema_version: String,
    /// RFC3339 UTC timestamp when the doctor output was emitted
    pub emitted_at: DateTime<Utc>,
    /// Overall health status (true if all checks pass or warn, false if any fail)
    pub ok: bool,
    /// Health checks performed (sorted by name before emission)
    pub checks: Vec<DoctorCheck>,
    /// Effective configuration with source attribution
    pub effective_config: BTreeMap<String, ConfigValue>,
}

/// Individual health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

/// Status of a health check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_serializes_snake_case() {
        let json = serde_json::to_string(&CheckStatus::Warn).unwrap();
        assert_eq!(json, r#""warn""#);
    }

    #[test]
    fn test_config_source_display_matches_serde() {
        for source in [
            ConfigSource::Cli,
            ConfigSource::Env,
            ConfigSource::Config,
            ConfigSource::Programmatic,
            ConfigSource::Default,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{source}\""));
        }
    }
}
