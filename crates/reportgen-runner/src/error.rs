use thiserror::Error;

/// Why a child process produced no usable output.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("could not run process: {reason}")]
    NativeExecutionFailed { reason: String },

    #[error("process killed after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}
