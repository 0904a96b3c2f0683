use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use reportgen_utils::error::{ConfigError, ReportError};

use super::{
    AnthropicConfig, CliArgs, CompilerConfig, Config, ConfigSource, GeminiConfig,
    GenerationConfig, LlmConfig, OpenRouterConfig, OutputConfig,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    llm: Option<LlmConfig>,
    generation: Option<PartialGeneration>,
    compiler: Option<PartialCompiler>,
    output: Option<PartialOutput>,
}

// File sections carry no defaults of their own; absent keys keep the
// built-in values.
#[derive(Debug, Default, Deserialize, Serialize)]
struct PartialGeneration {
    max_attempts: Option<u32>,
    min_response_length: Option<usize>,
    backoff_base_ms: Option<u64>,
    section_delay_ms: Option<u64>,
    call_budget: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct PartialCompiler {
    program: Option<String>,
    passes: Option<u32>,
    timeout_secs: Option<u64>,
    min_output_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct PartialOutput {
    dir: Option<PathBuf>,
    default_color: Option<String>,
}

/// Overwrite `$target` with `$value` when present and record `$source` under `$key`.
macro_rules! apply {
    ($attr:expr, $target:expr, $value:expr, $key:literal, $source:expr) => {
        if let Some(v) = $value {
            $target = Some(v);
            $attr.insert($key.to_string(), $source.clone());
        }
    };
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        Self::discover_with_env(start_dir, cli_args, |key| env::var(key).ok())
    }

    /// Path-and-environment driven variant used by tests to avoid
    /// process-global state.
    pub(crate) fn discover_with_env<F>(start_dir: &Path, cli_args: &CliArgs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::defaults();

        let config_path = if let Some(explicit_path) = &cli_args.config_path {
            Some(explicit_path.clone())
        } else {
            Self::discover_config_file_from(start_dir)?
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config);
        }

        config.apply_env(&lookup)?;
        config.apply_cli(cli_args);

        config.validate()?;

        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let src = ConfigSource::Config;
        let attr = &mut self.source_attribution;

        if let Some(file_llm) = file.llm {
            apply!(attr, self.llm.provider, file_llm.provider, "llm_provider", src);
            apply!(
                attr,
                self.llm.fallback_provider,
                file_llm.fallback_provider,
                "fallback_provider",
                src
            );
            apply!(
                attr,
                self.llm.request_timeout_secs,
                file_llm.request_timeout_secs,
                "request_timeout_secs",
                src
            );
            if let Some(gemini) = file_llm.gemini {
                self.llm.gemini = Some(gemini);
                attr.insert("llm_gemini_config".to_string(), src.clone());
            }
            if let Some(anthropic) = file_llm.anthropic {
                self.llm.anthropic = Some(anthropic);
                attr.insert("llm_anthropic_config".to_string(), src.clone());
            }
            if let Some(openrouter) = file_llm.openrouter {
                self.llm.openrouter = Some(openrouter);
                attr.insert("llm_openrouter_config".to_string(), src.clone());
            }
        }

        if let Some(g) = file.generation {
            let gen_cfg: &mut GenerationConfig = &mut self.generation;
            apply!(attr, gen_cfg.max_attempts, g.max_attempts, "max_attempts", src);
            apply!(
                attr,
                gen_cfg.min_response_length,
                g.min_response_length,
                "min_response_length",
                src
            );
            apply!(attr, gen_cfg.backoff_base_ms, g.backoff_base_ms, "backoff_base_ms", src);
            apply!(attr, gen_cfg.section_delay_ms, g.section_delay_ms, "section_delay_ms", src);
            apply!(attr, gen_cfg.call_budget, g.call_budget, "call_budget", src);
        }

        if let Some(c) = file.compiler {
            let compiler: &mut CompilerConfig = &mut self.compiler;
            apply!(attr, compiler.program, c.program, "compiler_program", src);
            apply!(attr, compiler.passes, c.passes, "compiler_passes", src);
            apply!(attr, compiler.timeout_secs, c.timeout_secs, "compiler_timeout_secs", src);
            apply!(attr, compiler.min_output_bytes, c.min_output_bytes, "min_output_bytes", src);
        }

        if let Some(o) = file.output {
            let output: &mut OutputConfig = &mut self.output;
            apply!(attr, output.dir, o.dir, "output_dir", src);
            apply!(attr, output.default_color, o.default_color, "default_color", src);
        }
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ReportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let src = ConfigSource::Env;
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_empty("REPORTGEN_LLM_PROVIDER") {
            self.llm.provider = Some(provider.trim().to_string());
            self.source_attribution.insert("llm_provider".to_string(), src.clone());
        }

        if let Some(model) = non_empty("GEMINI_MODEL") {
            self.llm
                .gemini
                .get_or_insert_with(GeminiConfig::default)
                .model = Some(model.trim().to_string());
            self.source_attribution.insert("llm_model".to_string(), src.clone());
        }

        if let Some(dir) = non_empty("REPORTGEN_OUTPUT_DIR") {
            self.output.dir = Some(PathBuf::from(dir));
            self.source_attribution.insert("output_dir".to_string(), src.clone());
        }

        if let Some(raw) = non_empty("REPORTGEN_CALL_BUDGET") {
            let budget = raw.trim().parse::<u32>().map_err(|_| {
                ReportError::Config(ConfigError::InvalidValue {
                    key: "REPORTGEN_CALL_BUDGET".to_string(),
                    value: format!("'{raw}' is not a non-negative integer"),
                })
            })?;
            self.generation.call_budget = Some(budget);
            self.source_attribution.insert("call_budget".to_string(), src);
        }

        Ok(())
    }

    fn apply_cli(&mut self, cli_args: &CliArgs) {
        let src = ConfigSource::Cli;

        if let Some(provider) = &cli_args.llm_provider {
            self.llm.provider = Some(provider.clone());
            self.source_attribution.insert("llm_provider".to_string(), src.clone());
        }

        // The model flag targets whichever provider ends up active.
        if let Some(model) = &cli_args.model {
            let model = Some(model.clone());
            match self.provider() {
                "anthropic" => {
                    self.llm
                        .anthropic
                        .get_or_insert_with(AnthropicConfig::default)
                        .model = model;
                }
                "openrouter" => {
                    self.llm
                        .openrouter
                        .get_or_insert_with(OpenRouterConfig::default)
                        .model = model;
                }
                _ => {
                    self.llm.gemini.get_or_insert_with(GeminiConfig::default).model = model;
                }
            }
            self.source_attribution.insert("llm_model".to_string(), src.clone());
        }

        if let Some(dir) = &cli_args.output_dir {
            self.output.dir = Some(dir.clone());
            self.source_attribution.insert("output_dir".to_string(), src);
        }
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.reportgen/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".reportgen").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: TomlConfig = toml::from_str(&content).map_err(|e| {
                    ReportError::Config(ConfigError::InvalidFile(format!(
                        "{}: {}",
                        path.display(),
                        e.message()
                    )))
                })?;
                Ok(config)
            }
            // An explicit path that does not exist falls back to defaults.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let cfg_dir = dir.join(".reportgen");
        fs::create_dir_all(&cfg_dir).unwrap();
        let path = cfg_dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_no_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap();

        assert_eq!(config.provider(), "gemini");
        assert_eq!(config.compiler_passes(), 3);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(
            config.source_attribution.get("compiler_passes"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn test_file_found_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[compiler]\npasses = 2\n\n[generation]\nsection_delay_ms = 0\n",
        );
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_with_env(&nested, &CliArgs::default(), no_env).unwrap();

        assert_eq!(config.compiler_passes(), 2);
        assert_eq!(config.section_delay().as_millis(), 0);
        // Untouched keys keep their defaults.
        assert_eq!(config.compiler_program(), "pdflatex");
        assert_eq!(
            config.source_attribution.get("compiler_passes"),
            Some(&ConfigSource::Config)
        );
    }

    #[test]
    fn test_discovery_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[compiler]\npasses = 2\n");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        let found = Config::discover_config_file_from(&repo).unwrap();
        assert!(found.is_none(), "search must not escape the repository");
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            "[llm]\nprovider = \"anthropic\"\n\n[output]\ndir = \"from-file\"\n",
        );

        let env: HashMap<&str, &str> = [
            ("REPORTGEN_LLM_PROVIDER", "openrouter"),
            ("REPORTGEN_OUTPUT_DIR", "from-env"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| (*v).to_string());

        let cli = CliArgs {
            output_dir: Some(PathBuf::from("from-cli")),
            ..CliArgs::default()
        };

        let config = Config::discover_with_env(temp.path(), &cli, lookup).unwrap();

        assert_eq!(config.provider(), "openrouter");
        assert_eq!(
            config.source_attribution.get("llm_provider"),
            Some(&ConfigSource::Env)
        );
        assert_eq!(config.output_dir(), Path::new("from-cli"));
        assert_eq!(
            config.source_attribution.get("output_dir"),
            Some(&ConfigSource::Cli)
        );
    }

    #[test]
    fn test_gemini_model_env_and_cli_model() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let lookup = |k: &str| (k == "GEMINI_MODEL").then(|| "gemini-1.5-pro".to_string());
        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), lookup).unwrap();
        assert_eq!(config.model_for_provider("gemini"), "gemini-1.5-pro");

        let cli = CliArgs {
            llm_provider: Some("anthropic".to_string()),
            model: Some("claude-custom".to_string()),
            ..CliArgs::default()
        };
        let config = Config::discover_with_env(temp.path(), &cli, no_env).unwrap();
        assert_eq!(config.model_for_provider("anthropic"), "claude-custom");
        assert_eq!(config.model_for_provider("gemini"), "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_call_budget_env_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let lookup = |k: &str| (k == "REPORTGEN_CALL_BUDGET").then(|| "lots".to_string());
        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), lookup).unwrap_err();

        let report_err = err.downcast_ref::<ReportError>().expect("typed config error");
        assert!(matches!(
            report_err,
            ReportError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_malformed_toml_is_invalid_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[compiler\npasses = ");

        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap_err();
        let report_err = err.downcast_ref::<ReportError>().expect("typed config error");
        assert!(matches!(
            report_err,
            ReportError::Config(ConfigError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_explicit_missing_path_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("nope.toml")),
            ..CliArgs::default()
        };
        let config = Config::discover_with_env(temp.path(), &cli, no_env).unwrap();
        assert_eq!(config.compiler_timeout().as_secs(), 180);
    }
}
