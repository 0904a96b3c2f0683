//! Process execution and document compilation
//!
//! All process execution goes through [`CommandSpec`] so that arguments are
//! passed as discrete argv elements and never through a shell. The typesetter
//! is driven by [`LatexCompiler`], which reports failure as a value and never
//! raises.

mod command_spec;
mod error;
mod latex;
mod native;
mod process;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use latex::{CompileOutcome, DocumentCompiler, LOG_TAIL_CHARS, LatexCompiler};
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
