//! Report generation pipeline
//!
//! Each stage asks the model for text and recovers locally from every model
//! failure: a fixed outline, an inline error marker for a section, a single
//! placeholder citation, or no appendix. Only asset and file-system problems
//! fail a request.

// Re-export shared crates so engine modules can use `crate::` paths.
pub use reportgen_config as config;
pub use reportgen_llm as llm;
pub use reportgen_runner as runner;
pub use reportgen_utils::error;
pub use reportgen_utils::logging;

pub mod appendix;
pub mod bibliography;
pub mod cover;
pub mod document;
pub mod figure;
pub mod orchestrator;
pub mod outline;
pub mod request;
pub mod sections;
pub mod workspace;

pub use appendix::generate_appendix;
pub use bibliography::{BibEntry, Bibliography, extract_entries, generate_bibliography};
pub use orchestrator::{ArtifactKind, GenerationSettings, ReportArtifact, ReportOrchestrator};
pub use outline::{Outline, OutlineFallbackReason, OutlineOrigin, Section, generate_outline};
pub use request::{GenerationRequest, RequestInput};
pub use sections::{Body, generate_body, generate_section};
