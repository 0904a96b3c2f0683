//! Configuration management for reportgen
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. Configuration files are TOML with
//! `[llm]`, `[generation]`, `[compiler]` and `[output]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use reportgen_utils::types::ConfigSource;

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Create a minimal Config for testing purposes
    ///
    /// Built-in defaults only, no file or environment lookup, and no pacing or
    /// backoff delays so pipelines run instantly.
    pub fn minimal_for_testing() -> Self {
        let mut config = Config::defaults();
        config.generation.backoff_base_ms = Some(0);
        config.generation.section_delay_ms = Some(0);
        config
    }
}
