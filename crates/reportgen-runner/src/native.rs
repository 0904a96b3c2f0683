use std::process::Stdio;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::RunnerError;
use crate::{CommandSpec, ProcessOutput, ProcessRunner};

/// Process runner on `std::process::Command`.
///
/// The child is waited on from a helper thread so the caller can give up
/// after the timeout; a child that overruns is killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn terminate_process(pid: u32) {
        #[cfg(unix)]
        {
            // SAFETY: kill(2) with a pid we spawned; failure (already exited) is harmless.
            unsafe {
                libc::kill(pid as i32, libc::SIGKILL);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
        }
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = %cmd.display(), timeout_secs = timeout.as_secs(), "Spawning process");

        let child = command
            .spawn()
            .map_err(|e| RunnerError::NativeExecutionFailed {
                reason: format!(
                    "Failed to spawn process '{}': {}",
                    cmd.program.to_string_lossy(),
                    e
                ),
            })?;

        let child_id = child.id();
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let _ = tx.send(child.wait_with_output());
        });

        match rx.recv_timeout(timeout) {
            Ok(output_result) => {
                let _ = handle.join();
                let output = output_result.map_err(|e| RunnerError::NativeExecutionFailed {
                    reason: format!("Failed to wait for process: {e}"),
                })?;

                Ok(ProcessOutput::new(
                    output.stdout,
                    output.stderr,
                    output.status.code(),
                    false,
                ))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(pid = child_id, timeout_secs = timeout.as_secs(), "Process timed out, killing");
                Self::terminate_process(child_id);
                let _ = handle.join();

                Err(RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunnerError::NativeExecutionFailed {
                reason: "Process monitoring thread terminated unexpectedly".to_string(),
            }),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_echo_runs_without_shell() {
        let output = NativeRunner::new()
            .run(
                &CommandSpec::new("echo").arg("$HOME; ls"),
                Duration::from_secs(10),
            )
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_string().trim(), "$HOME; ls");
    }

    #[test]
    fn test_nonzero_exit_is_ok() {
        let output = NativeRunner::new()
            .run(&CommandSpec::new("false"), Duration::from_secs(10))
            .unwrap();
        assert_eq!(output.exit_code, Some(1));
        assert!(!output.success());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = NativeRunner::new().run(
            &CommandSpec::new("reportgen-no-such-program-xyz"),
            Duration::from_secs(10),
        );
        assert!(matches!(
            result,
            Err(RunnerError::NativeExecutionFailed { .. })
        ));
    }

    #[test]
    fn test_timeout_kills_process() {
        let start = std::time::Instant::now();
        let result = NativeRunner::new().run(
            &CommandSpec::new("sleep").arg("30"),
            Duration::from_millis(200),
        );

        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
