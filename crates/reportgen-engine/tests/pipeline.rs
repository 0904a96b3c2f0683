//! Full pipeline runs against a scripted model and a scripted typesetter.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use reportgen_engine::config::{Config, RgbColor};
use reportgen_engine::llm::GenerationFailure;
use reportgen_engine::llm::test_support::ScriptedGenerator;
use reportgen_engine::runner::test_support::ScriptedRunner;
use reportgen_engine::runner::{CommandSpec, LatexCompiler, ProcessOutput};
use reportgen_engine::{
    ArtifactKind, GenerationRequest, GenerationSettings, ReportOrchestrator, RequestInput,
};
use tempfile::TempDir;

fn model(prompt: &str) -> Result<String, GenerationFailure> {
    let text = if prompt.contains("JSON array") {
        "```json\n[{\"title\": \"Overview\"}, {\"title\": \"Overview\"}, {\"title\": \"Impact\", \"subsections\": [\"Costs\"]}]\n```"
    } else if prompt.contains("bibliography entries") {
        "Here you go:\n\\bibitem{Smith2021} Smith, A. *Rivers*.\n\\bibitem{Jones2019} Jones, B. *Floods*."
    } else if prompt.contains("starting with YES or NO") {
        "YES, a glossary would help readers."
    } else if prompt.contains("appendix section") {
        "## Appendix A: Glossary\n- **Silt**: fine sediment"
    } else {
        "Erosion removes about 30% of topsoil_layers.\n- first point\n- second point\nClosing remark."
    };
    Ok(text.to_string())
}

/// Writes a PDF of `size` bytes beside the document on every pass.
fn typesetter(size: usize) -> ScriptedRunner {
    ScriptedRunner::new(move |cmd: &CommandSpec| {
        let dir = cmd.cwd.clone().unwrap_or_default();
        if let Some(tex) = cmd.args.last() {
            let pdf = Path::new(tex).with_extension("pdf");
            fs::write(dir.join(pdf), vec![b'%'; size]).expect("write fake pdf");
        }
        Ok(ProcessOutput::new(Vec::new(), Vec::new(), Some(0), false))
    })
}

fn request() -> GenerationRequest {
    GenerationRequest::from_input(
        RequestInput {
            query: "river bank erosion".to_string(),
            title: "River Bank Erosion".to_string(),
            authors: "Kim Lee, Sam Ortiz".to_string(),
            mentors: Some("Dr. Rao".to_string()),
            date: Some("January 02, 2025".to_string()),
            color: Some("200, 30, 30".to_string()),
            ..RequestInput::default()
        },
        RgbColor::DEFAULT,
    )
    .expect("valid request")
}

fn orchestrator(generator: ScriptedGenerator, pdf_size: usize, out: &Path) -> ReportOrchestrator {
    let config = Config::minimal_for_testing();
    let compiler = LatexCompiler::with_runner(typesetter(pdf_size), &config);
    ReportOrchestrator::new(
        Arc::new(generator),
        Arc::new(compiler),
        GenerationSettings {
            output_dir: out.to_path_buf(),
            ..GenerationSettings::from_config(&config)
        },
    )
}

#[tokio::test]
async fn test_full_report_is_compiled() {
    let out = TempDir::new().unwrap();
    let artifact = orchestrator(ScriptedGenerator::from_fn(model), 8192, out.path())
        .generate(&request())
        .await
        .unwrap();

    assert_eq!(artifact.kind, ArtifactKind::Pdf);
    assert!(artifact.path.starts_with(out.path()));
    assert!(artifact.path.is_file());

    let tex = fs::read_to_string(&artifact.source).unwrap();
    assert_eq!(tex.matches(r"\section{Overview}").count(), 1, "duplicate section dropped");
    assert!(tex.contains(r"\subsection{Costs}"));
    assert!(tex.contains(r"30\% of topsoil\_layers"));
    assert!(tex.contains("\\begin{itemize}\n  \\item first point\n  \\item second point\n\\end{itemize}\nClosing remark."));
    assert!(tex.contains(r"\definecolor{primarycolor}{RGB}{200,30,30}"));
    assert!(tex.contains(r"\textbf{Mentors:}"));
    assert!(!tex.contains("Here you go"));
    assert!(tex.contains(r"\bibitem{Smith2021} Smith, A. \textit{Rivers}."));
    assert!(tex.contains(r"\addcontentsline{toc}{section}{Appendices}"));
    assert!(tex.contains(r"\subsection*{Appendix A: Glossary}"));
}

#[tokio::test]
async fn test_empty_pdf_falls_back_to_source() {
    let out = TempDir::new().unwrap();
    let artifact = orchestrator(ScriptedGenerator::from_fn(model), 16, out.path())
        .generate(&request())
        .await
        .unwrap();

    assert_eq!(artifact.kind, ArtifactKind::Source);
    assert_eq!(artifact.path.extension().unwrap(), "tex");
}

#[tokio::test]
async fn test_prompts_issued_in_pipeline_order() {
    let out = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::from_fn(model));
    let config = Config::minimal_for_testing();
    let orchestrator = ReportOrchestrator::new(
        generator.clone(),
        Arc::new(LatexCompiler::with_runner(typesetter(8192), &config)),
        GenerationSettings {
            output_dir: out.path().to_path_buf(),
            ..GenerationSettings::from_config(&config)
        },
    );
    orchestrator.generate(&request()).await.unwrap();

    let prompts = generator.prompts();
    assert!(prompts[0].contains("JSON array"));
    assert!(prompts[1].contains("\"Overview\""));
    assert!(prompts[2].contains("\"Impact\""));
    assert!(prompts[3].contains("\"Impact - Costs\""));
    assert!(prompts[4].contains("bibliography entries"));
    assert!(prompts[5].contains("YES or NO"));
    assert!(prompts[6].contains("appendix section"));
    assert_eq!(prompts.len(), 7);
}
