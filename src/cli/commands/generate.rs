//! `reportgen generate`: the full pipeline.

use std::sync::Arc;

use anyhow::Result;
use reportgen_config::Config;
use reportgen_engine::{
    ArtifactKind, GenerationRequest, GenerationSettings, ReportOrchestrator, RequestInput,
};
use reportgen_runner::LatexCompiler;
use reportgen_utils::exit_codes::ExitCode;

use super::model_client;

pub async fn execute_generate_command(
    input: RequestInput,
    config: &Config,
    verbose: bool,
) -> Result<ExitCode> {
    let request = GenerationRequest::from_input(input, config.default_color())?;
    let client = model_client(config)?;

    let orchestrator = ReportOrchestrator::new(
        Arc::new(client),
        Arc::new(LatexCompiler::from_config(config)),
        GenerationSettings::from_config(config),
    );
    let artifact = orchestrator.generate(&request).await?;

    match artifact.kind {
        ArtifactKind::Pdf => println!("✓ Report compiled: {}", artifact.path.display()),
        ArtifactKind::Source => {
            println!("⚠ Compilation failed; LaTeX source: {}", artifact.path.display());
            if let Some(tail) = artifact.log_tail.as_deref().filter(|_| verbose) {
                eprintln!("\n  Typesetter log (tail):\n{tail}");
            }
        }
    }

    if !artifact.degraded_stages.is_empty() {
        eprintln!(
            "⚠ Fallback output used for: {}",
            artifact.degraded_stages.join(", ")
        );
    }
    if verbose {
        eprintln!("\n  Stage timings:\n{}", artifact.timings.summary());
    }

    Ok(ExitCode::SUCCESS)
}
