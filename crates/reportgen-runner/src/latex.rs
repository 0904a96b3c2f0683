//! Multi-pass `pdflatex` driver.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reportgen_config::Config;
use tracing::{error, info, warn};

use crate::{CommandSpec, NativeRunner, ProcessRunner, RunnerError};

/// Characters of the `.log` file kept when a pass fails.
pub const LOG_TAIL_CHARS: usize = 2000;

/// Result of compiling one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    /// Where the compiled output is (or would have been) written.
    pub output_path: PathBuf,
    pub success: bool,
    pub passes_run: u32,
    /// Tail of the typesetter log, or the runner error, when a pass failed.
    pub log_tail: Option<String>,
}

/// The typesetting step, as seen by the report assembler.
///
/// Compilation failure is an outcome, not an error: implementations must
/// report it through [`CompileOutcome::success`].
pub trait DocumentCompiler: Send + Sync {
    fn compile(&self, document: &Path) -> CompileOutcome;
}

/// Runs the LaTeX program over a `.tex` file in its own directory.
pub struct LatexCompiler<R = NativeRunner> {
    runner: R,
    program: String,
    passes: u32,
    timeout: Duration,
    min_output_bytes: u64,
}

impl LatexCompiler<NativeRunner> {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_runner(NativeRunner::new(), config)
    }
}

impl<R: ProcessRunner> LatexCompiler<R> {
    #[must_use]
    pub fn with_runner(runner: R, config: &Config) -> Self {
        Self {
            runner,
            program: config.compiler_program().to_string(),
            passes: config.compiler_passes().max(1),
            timeout: config.compiler_timeout(),
            min_output_bytes: config.min_output_bytes(),
        }
    }

    /// `<program> -interaction=nonstopmode -halt-on-error <file>` run from the
    /// document's directory.
    #[must_use]
    pub fn command_for(&self, document: &Path) -> CommandSpec {
        let dir = parent_dir(document);
        let file_name = document
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| document.as_os_str().to_os_string());

        CommandSpec::new(&self.program)
            .args(["-interaction=nonstopmode", "-halt-on-error"])
            .arg(file_name)
            .cwd(dir)
    }

    fn output_is_usable(&self, pdf: &Path) -> bool {
        fs::metadata(pdf)
            .map(|m| m.is_file() && m.len() > self.min_output_bytes)
            .unwrap_or(false)
    }
}

impl<R: ProcessRunner + Send + Sync> DocumentCompiler for LatexCompiler<R> {
    fn compile(&self, document: &Path) -> CompileOutcome {
        let cmd = self.command_for(document);
        let pdf = document.with_extension("pdf");
        let mut log_tail = None;
        let mut passes_run = 0;

        for pass in 1..=self.passes {
            info!(pass, passes = self.passes, program = %self.program, "Running typesetter pass");
            passes_run = pass;

            match self.runner.run(&cmd, self.timeout) {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    let tail = read_log_tail(&document.with_extension("log"))
                        .unwrap_or_else(|| tail_chars(&output.stdout_string(), LOG_TAIL_CHARS));
                    error!(pass, exit_code = ?output.exit_code, log_tail = %tail, "Typesetter pass failed");
                    log_tail = Some(tail);
                    break;
                }
                Err(e @ RunnerError::Timeout { .. }) => {
                    warn!(pass, error = %e, "Typesetter pass timed out");
                    log_tail = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    error!(pass, error = %e, "Typesetter could not be run");
                    log_tail = Some(e.to_string());
                    break;
                }
            }
        }

        let success = self.output_is_usable(&pdf);
        if success {
            info!(output = %pdf.display(), "PDF compilation successful");
        } else {
            error!(
                output = %pdf.display(),
                min_bytes = self.min_output_bytes,
                "PDF compilation failed or produced an empty file"
            );
        }

        CompileOutcome {
            output_path: pdf,
            success,
            passes_run,
            log_tail,
        }
    }
}

fn parent_dir(document: &Path) -> PathBuf {
    match document.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn read_log_tail(log: &Path) -> Option<String> {
    let bytes = fs::read(log).ok()?;
    Some(tail_chars(&String::from_utf8_lossy(&bytes), LOG_TAIL_CHARS))
}

fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessOutput;
    use crate::test_support::ScriptedRunner;
    use std::ffi::OsString;

    fn compiler(runner: ScriptedRunner) -> LatexCompiler<ScriptedRunner> {
        LatexCompiler::with_runner(runner, &Config::minimal_for_testing())
    }

    fn ok() -> Result<ProcessOutput, RunnerError> {
        Ok(ProcessOutput::new(Vec::new(), Vec::new(), Some(0), false))
    }

    #[test]
    fn test_command_shape() {
        let c = compiler(ScriptedRunner::always(ok));
        let cmd = c.command_for(Path::new("/tmp/job/report_report.tex"));

        assert_eq!(cmd.program, OsString::from("pdflatex"));
        assert_eq!(
            cmd.args,
            vec![
                OsString::from("-interaction=nonstopmode"),
                OsString::from("-halt-on-error"),
                OsString::from("report_report.tex"),
            ]
        );
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp/job")));
    }

    #[test]
    fn test_three_passes_and_large_pdf_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("doc.tex");
        fs::write(&tex, "x").unwrap();
        fs::write(dir.path().join("doc.pdf"), vec![0u8; 4096]).unwrap();

        let runner = ScriptedRunner::always(ok);
        let c = compiler(runner);
        let outcome = c.compile(&tex);

        assert!(outcome.success);
        assert_eq!(outcome.passes_run, 3);
        assert_eq!(c.runner.calls().len(), 3);
        assert_eq!(outcome.output_path, dir.path().join("doc.pdf"));
        assert!(outcome.log_tail.is_none());
    }

    #[test]
    fn test_tiny_pdf_is_failure_even_with_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("doc.tex");
        fs::write(dir.path().join("doc.pdf"), b"%PDF-1.5").unwrap();

        let outcome = compiler(ScriptedRunner::always(ok)).compile(&tex);
        assert!(!outcome.success);
    }

    #[test]
    fn test_failed_pass_stops_and_captures_log_tail() {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join("doc.tex");
        let log = format!("{}! Undefined control sequence.", "x".repeat(5000));
        fs::write(dir.path().join("doc.log"), &log).unwrap();

        let runner = ScriptedRunner::always(|| {
            Ok(ProcessOutput::new(Vec::new(), Vec::new(), Some(1), false))
        });
        let c = compiler(runner);
        let outcome = c.compile(&tex);

        assert!(!outcome.success);
        assert_eq!(outcome.passes_run, 1);
        assert_eq!(c.runner.calls().len(), 1);
        let tail = outcome.log_tail.unwrap();
        assert_eq!(tail.chars().count(), LOG_TAIL_CHARS);
        assert!(tail.ends_with("! Undefined control sequence."));
    }

    #[test]
    fn test_spawn_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::always(|| {
            Err(RunnerError::NativeExecutionFailed {
                reason: "No such file or directory".to_string(),
            })
        });

        let outcome = compiler(runner).compile(&dir.path().join("doc.tex"));
        assert!(!outcome.success);
        assert!(outcome.log_tail.unwrap().contains("No such file"));
    }

    #[test]
    fn test_timeout_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::always(|| Err(RunnerError::Timeout { timeout_seconds: 180 }));

        let outcome = compiler(runner).compile(&dir.path().join("doc.tex"));
        assert!(!outcome.success);
        assert!(outcome.log_tail.unwrap().contains("180"));
    }

    #[test]
    fn test_tail_chars_is_char_safe() {
        assert_eq!(tail_chars("ééé", 2), "éé");
        assert_eq!(tail_chars("ab", 10), "ab");
    }

    #[test]
    fn test_relative_document_uses_current_dir() {
        let c = compiler(ScriptedRunner::always(ok));
        assert_eq!(c.command_for(Path::new("doc.tex")).cwd, Some(PathBuf::from(".")));
    }
}
