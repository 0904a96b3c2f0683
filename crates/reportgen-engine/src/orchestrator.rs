//! End-to-end report pipeline.
//!
//! Stages run strictly in sequence for one request: assets, outline, cover,
//! body, bibliography, appendix, assembly, compilation. Model trouble in any
//! stage degrades that stage's output; only asset and workspace problems
//! fail the request. A failed compilation still yields the LaTeX source.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{Instrument, info, warn};

use crate::appendix::generate_appendix;
use crate::bibliography::generate_bibliography;
use crate::config::Config;
use crate::cover::render_cover;
use crate::document::{DocumentParts, assemble};
use crate::error::ReportError;
use crate::figure::render_figure;
use crate::llm::TextGenerator;
use crate::logging::{
    StageTimings, log_stage_complete, log_stage_degraded, log_stage_start, report_span, stage_span,
};
use crate::outline::generate_outline;
use crate::request::GenerationRequest;
use crate::runner::{CompileOutcome, DocumentCompiler};
use crate::sections::generate_body;
use crate::workspace::{AssetGuard, ReportWorkspace};

/// Knobs that are not part of an individual request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Slept between consecutive section prompts.
    pub section_delay: Duration,
    /// Parent of every per-request workspace.
    pub output_dir: PathBuf,
}

impl GenerationSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            section_delay: config.section_delay(),
            output_dir: config.output_dir().to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The compiled document.
    Pdf,
    /// Compilation failed; the LaTeX source is returned instead.
    Source,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::Source => f.write_str("latex source"),
        }
    }
}

/// What a request produced.
#[derive(Debug)]
pub struct ReportArtifact {
    /// The PDF when compilation succeeded, otherwise the `.tex` file.
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// Always the `.tex` file.
    pub source: PathBuf,
    /// Typesetter log excerpt from a failed pass.
    pub log_tail: Option<String>,
    /// Stages whose output is a fallback.
    pub degraded_stages: Vec<String>,
    pub timings: StageTimings,
}

impl ReportArtifact {
    pub fn is_pdf(&self) -> bool {
        self.kind == ArtifactKind::Pdf
    }
}

/// Drives one request at a time through every stage.
///
/// The generator and compiler are shared, so one orchestrator can serve
/// concurrent requests; each request gets its own workspace directory.
pub struct ReportOrchestrator {
    generator: Arc<dyn TextGenerator>,
    compiler: Arc<dyn DocumentCompiler>,
    settings: GenerationSettings,
}

struct Stage<'a> {
    report_id: &'a str,
    name: &'static str,
    started: Instant,
}

impl<'a> Stage<'a> {
    fn start(report_id: &'a str, name: &'static str) -> Self {
        log_stage_start(report_id, name);
        Self {
            report_id,
            name,
            started: Instant::now(),
        }
    }

    fn finish(self, timings: &mut StageTimings) {
        let elapsed = self.started.elapsed();
        log_stage_complete(self.report_id, self.name, elapsed.as_millis());
        timings.record(self.name, elapsed);
    }
}

impl ReportOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        compiler: Arc<dyn DocumentCompiler>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            generator,
            compiler,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Produce a report for `request`.
    ///
    /// # Errors
    ///
    /// `ReportError::Asset` for a missing or uncopyable logo or figure, and
    /// `ReportError::Workspace` when the output directory or document cannot
    /// be written. Model and compiler failures never surface here.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<ReportArtifact, ReportError> {
        let report_id = format!(
            "{}-{}",
            crate::workspace::slugify(&request.title),
            Local::now().format("%Y%m%d%H%M%S")
        );
        let span = report_span(&report_id);
        self.run(request, &report_id).instrument(span).await
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        report_id: &str,
    ) -> Result<ReportArtifact, ReportError> {
        let generator = self.generator.as_ref();
        let mut timings = StageTimings::new();
        let mut degraded = Vec::new();

        let workspace = ReportWorkspace::create(&self.settings.output_dir, &request.title)?;
        info!(topic = %request.query, workspace = %workspace.path().display(), "Generating report");

        let stage = Stage::start(report_id, "assets");
        let mut assets = AssetGuard::new();
        let logo = request
            .logo
            .as_deref()
            .map(|p| assets.copy_in(p, workspace.path(), "uploaded_logo"))
            .transpose()?;
        let figure = request
            .figure
            .as_deref()
            .map(|p| assets.copy_in(p, workspace.path(), "user_figure"))
            .transpose()?;
        stage.finish(&mut timings);

        let stage = Stage::start(report_id, "outline");
        let outline = generate_outline(&request.query, generator)
            .instrument(stage_span(report_id, "outline"))
            .await;
        if let crate::outline::OutlineOrigin::Fallback(reason) = &outline.origin {
            log_stage_degraded(report_id, "outline", &reason.to_string());
            degraded.push("outline".to_string());
        }
        stage.finish(&mut timings);

        let cover = render_cover(request, logo.as_deref());

        let stage = Stage::start(report_id, "sections");
        let figure_block = figure
            .as_deref()
            .map(|name| render_figure(name, request.figure_caption.as_deref()));
        let body = generate_body(
            &outline.sections,
            &request.query,
            generator,
            self.settings.section_delay,
            figure_block,
        )
        .instrument(stage_span(report_id, "sections"))
        .await;
        if body.failures > 0 {
            log_stage_degraded(
                report_id,
                "sections",
                &format!("{} of {} sections failed", body.failures, body.calls),
            );
            degraded.push("sections".to_string());
        }
        stage.finish(&mut timings);

        let stage = Stage::start(report_id, "bibliography");
        let bibliography = generate_bibliography(&request.query, generator)
            .instrument(stage_span(report_id, "bibliography"))
            .await;
        if bibliography.is_fallback() {
            log_stage_degraded(report_id, "bibliography", "no usable entries");
            degraded.push("bibliography".to_string());
        }
        stage.finish(&mut timings);

        let stage = Stage::start(report_id, "appendix");
        let appendix = generate_appendix(&request.query, generator)
            .instrument(stage_span(report_id, "appendix"))
            .await;
        stage.finish(&mut timings);

        let stage = Stage::start(report_id, "assemble");
        let document = assemble(
            &request.title,
            request.color,
            &DocumentParts {
                cover,
                body: body.latex,
                bibliography: bibliography.latex,
                appendix,
            },
        );
        let tex_path = workspace.write_document(&document)?;
        stage.finish(&mut timings);

        let stage = Stage::start(report_id, "compile");
        let outcome = self.compile(tex_path.clone(), workspace.pdf_path()).await;
        stage.finish(&mut timings);

        drop(assets);
        let dir = workspace.keep();
        let source = dir.join(file_name(&tex_path));

        let artifact = if outcome.success {
            info!(path = %outcome.output_path.display(), passes = outcome.passes_run, "Report compiled");
            ReportArtifact {
                path: dir.join(file_name(&outcome.output_path)),
                kind: ArtifactKind::Pdf,
                source,
                log_tail: None,
                degraded_stages: degraded,
                timings,
            }
        } else {
            warn!(path = %source.display(), "Compilation failed, returning LaTeX source");
            degraded.push("compile".to_string());
            ReportArtifact {
                path: source.clone(),
                kind: ArtifactKind::Source,
                source,
                log_tail: outcome.log_tail,
                degraded_stages: degraded,
                timings,
            }
        };
        Ok(artifact)
    }

    /// Run the blocking compiler off the async runtime.
    async fn compile(&self, tex_path: PathBuf, pdf_path: PathBuf) -> CompileOutcome {
        let compiler = Arc::clone(&self.compiler);
        match tokio::task::spawn_blocking(move || compiler.compile(&tex_path)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Compiler task did not complete");
                CompileOutcome {
                    output_path: pdf_path,
                    success: false,
                    passes_run: 0,
                    log_tail: Some(e.to_string()),
                }
            }
        }
    }
}

fn file_name(path: &std::path::Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or_default()
}
