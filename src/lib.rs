//! reportgen - typeset reports written by a language model
//!
//! Given a topic and cover metadata, reportgen asks a model for an outline,
//! section bodies, a bibliography and an optional appendix, converts the
//! model's markdown into safe LaTeX, and compiles the result to PDF. Every
//! model failure degrades one stage instead of failing the report, and a
//! failed compilation still returns the LaTeX source.
//!
//! ```bash
//! reportgen generate --title "Soil Erosion" --query "causes and control of soil erosion" \
//!     --authors "Kim Lee, Sam Ortiz"
//! echo "# Notes\n- 50% done" | reportgen convert
//! reportgen doctor --json
//! ```
//!
//! Library users drive [`ReportOrchestrator`] directly with their own
//! [`TextGenerator`] and [`DocumentCompiler`].

pub mod cli;

pub use reportgen_config::{CliArgs, Config, ConfigBuilder, RgbColor};
pub use reportgen_engine::{
    ArtifactKind, GenerationRequest, GenerationSettings, ReportArtifact, ReportOrchestrator,
    RequestInput,
};
pub use reportgen_llm::{GenerationFailure, ModelClient, TextGenerator};
pub use reportgen_markup::{escape, transform};
pub use reportgen_runner::{DocumentCompiler, LatexCompiler};
pub use reportgen_utils::error::ReportError;
pub use reportgen_utils::exit_codes::ExitCode;
