//! Exit code constants for reportgen.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Report produced (PDF or LaTeX source) |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `ASSET_ERROR` | Logo or figure could not be read or copied |
//! | 70 | `MODEL_UNAVAILABLE` | Model endpoint could not be constructed |

/// Exit codes matching the documented exit code table.
///
/// Use the named constants for common exit codes, or [`as_i32()`](Self::as_i32)
/// to get the numeric value for `std::process::exit()`.
///
/// ```rust
/// use reportgen_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::MODEL_UNAVAILABLE, ExitCode::from_i32(70));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - a PDF or a LaTeX source file was produced
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Asset error - a user-supplied logo or figure could not be used
    pub const ASSET_ERROR: ExitCode = ExitCode(3);

    /// Model unavailable - credentials missing or provider unusable at start-up
    pub const MODEL_UNAVAILABLE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::ASSET_ERROR.as_i32(), 3);
        assert_eq!(ExitCode::MODEL_UNAVAILABLE.as_i32(), 70);
    }

    #[test]
    fn test_i32_conversions() {
        let code: ExitCode = 3.into();
        assert_eq!(code, ExitCode::ASSET_ERROR);
        let raw: i32 = ExitCode::CLI_ARGS.into();
        assert_eq!(raw, 2);
    }
}
