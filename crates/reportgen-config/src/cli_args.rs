use std::path::PathBuf;

/// CLI arguments that can override configuration values.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit configuration file, bypassing discovery.
    pub config_path: Option<PathBuf>,
    /// `--provider`
    pub llm_provider: Option<String>,
    /// `--model`, applied to the active provider.
    pub model: Option<String>,
    /// `--output-dir`
    pub output_dir: Option<PathBuf>,
}
