//! Preflight checks: typesetter on PATH, model credentials, a writable
//! output directory, and a usable configuration.

pub use reportgen_utils::types::{CheckStatus, DoctorCheck, DoctorOutput};

use std::path::Path;

use chrono::Utc;
use reportgen_config::{Config, RgbColor};

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Variables a provider reads its API key from, in lookup order.
pub fn key_variables(config: &Config, provider: &str) -> Vec<String> {
    let configured = match provider {
        "gemini" => config.llm.gemini.as_ref().and_then(|g| g.api_key_env.clone()),
        "anthropic" => config.llm.anthropic.as_ref().and_then(|a| a.api_key_env.clone()),
        "openrouter" => config.llm.openrouter.as_ref().and_then(|o| o.api_key_env.clone()),
        _ => return Vec::new(),
    };
    if let Some(var) = configured {
        return vec![var];
    }
    match provider {
        "gemini" => vec!["GOOGLE_API_KEY".to_string(), "GEMINI_API_KEY".to_string()],
        "anthropic" => vec!["ANTHROPIC_API_KEY".to_string()],
        _ => vec!["OPENROUTER_API_KEY".to_string()],
    }
}

fn check(name: &str, status: CheckStatus, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        status,
        details: details.into(),
    }
}

pub struct DoctorCommand {
    config: Config,
    env: EnvLookup,
}

impl DoctorCommand {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_env_lookup(config, |key| std::env::var(key).ok())
    }

    /// Read environment variables through `lookup` instead of the process
    /// environment.
    pub fn with_env_lookup<F>(config: Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        Self {
            config,
            env: Box::new(lookup),
        }
    }

    /// Run every check. With `strict`, a warning also makes `ok` false.
    pub fn run(&self, strict: bool) -> DoctorOutput {
        let mut checks = vec![
            self.check_compiler(),
            self.check_provider("llm_provider", self.config.provider(), CheckStatus::Fail),
            self.check_output_dir(),
            self.check_default_color(),
            check("config_parse", CheckStatus::Pass, "Configuration parsed and validated"),
        ];
        if let Some(fallback) = self.config.llm.fallback_provider.as_deref() {
            checks.push(self.check_provider("fallback_provider", fallback, CheckStatus::Warn));
        }

        checks.sort_by(|a, b| a.name.cmp(&b.name));

        let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
        let has_warn = checks.iter().any(|c| c.status == CheckStatus::Warn);

        DoctorOutput {
            schema_version: "1".to_string(),
            emitted_at: Utc::now(),
            ok: !has_fail && (!strict || !has_warn),
            checks,
            effective_config: self.config.effective_config(),
        }
    }

    fn check_compiler(&self) -> DoctorCheck {
        let program = self.config.compiler_program();
        match which::which(program) {
            Ok(path) => check(
                "compiler",
                CheckStatus::Pass,
                format!("{program} found at {}", path.display()),
            ),
            Err(_) => check(
                "compiler",
                CheckStatus::Fail,
                format!(
                    "{program} not found in PATH. Install a TeX distribution or set [compiler] program; \
                     reports will be returned as LaTeX source until then"
                ),
            ),
        }
    }

    /// Only the presence of the key variable is checked, never its value.
    fn check_provider(&self, name: &str, provider: &str, missing: CheckStatus) -> DoctorCheck {
        let vars = key_variables(&self.config, provider);
        if vars.is_empty() {
            return check(
                name,
                CheckStatus::Fail,
                format!("Unknown provider '{provider}'. Supported: gemini, anthropic, openrouter"),
            );
        }

        let model = self.config.model_for_provider(provider);
        let found = vars
            .iter()
            .find(|var| (self.env)(var.as_str()).is_some_and(|v| !v.trim().is_empty()));
        match found {
            Some(var) => check(
                name,
                CheckStatus::Pass,
                format!("Provider: {provider} (API key present in {var}, model: {model})"),
            ),
            None => check(
                name,
                missing,
                format!("Provider: {provider} (no API key; set {})", vars.join(" or ")),
            ),
        }
    }

    fn check_output_dir(&self) -> DoctorCheck {
        let dir = self.config.output_dir();
        match probe_writable(dir) {
            Ok(()) => check(
                "output_dir",
                CheckStatus::Pass,
                format!("{} is writable", dir.display()),
            ),
            Err(e) => check(
                "output_dir",
                CheckStatus::Fail,
                format!("Cannot write to {}: {e}", dir.display()),
            ),
        }
    }

    fn check_default_color(&self) -> DoctorCheck {
        let raw = self.config.output.default_color.as_deref().unwrap_or_default();
        if raw.is_empty() {
            return check("default_color", CheckStatus::Pass, RgbColor::DEFAULT.to_string());
        }
        match raw.parse::<RgbColor>() {
            Ok(color) => check("default_color", CheckStatus::Pass, color.to_string()),
            Err(e) => check(
                "default_color",
                CheckStatus::Warn,
                format!("{e}; using {}", RgbColor::DEFAULT),
            ),
        }
    }
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    tempfile::NamedTempFile::new_in(dir).map(drop)
}
