//! Logging and observability infrastructure for reportgen
//!
//! Structured logging via `tracing`, with a compact human format by default
//! and a JSON format for machine consumption.

use std::time::{Duration, Instant};
use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Build the default filter.
///
/// `RUST_LOG` wins when set; otherwise verbose runs log reportgen at debug.
fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("reportgen=debug,info")
            } else {
                EnvFilter::try_new("reportgen=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the tracing subscriber for structured logging.
///
/// Logs go to stderr so that command output on stdout stays parseable.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = build_filter(verbose);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .try_init()?;
        }
        LogFormat::Compact if verbose => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_span_events(FmtSpan::CLOSE)
                        .compact(),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span covering one whole report request.
pub fn report_span(report_id: &str) -> tracing::Span {
    span!(Level::INFO, "report", report_id = %report_id)
}

/// Span covering one pipeline stage (outline, sections, bibliography, ...).
pub fn stage_span(report_id: &str, stage: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "stage",
        report_id = %report_id,
        stage = %stage,
    )
}

pub fn log_stage_start(report_id: &str, stage: &str) {
    info!(report_id = %report_id, stage = %stage, "Starting stage");
}

pub fn log_stage_complete(report_id: &str, stage: &str, duration_ms: u128) {
    info!(
        report_id = %report_id,
        stage = %stage,
        duration_ms = %duration_ms,
        "Stage completed"
    );
}

/// Log a stage that fell back to its degraded output.
pub fn log_stage_degraded(report_id: &str, stage: &str, reason: &str) {
    warn!(
        report_id = %report_id,
        stage = %stage,
        reason = %reason,
        "Stage degraded to fallback output"
    );
}

/// Wall-clock timings of the stages of a single report.
#[derive(Debug)]
pub struct StageTimings {
    start_time: Instant,
    stages: Vec<(String, Duration)>,
}

impl Default for StageTimings {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTimings {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            stages: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: impl Into<String>, duration: Duration) {
        self.stages.push((stage.into(), duration));
    }

    #[must_use]
    pub fn stages(&self) -> &[(String, Duration)] {
        &self.stages
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// One line per stage followed by the total, for verbose CLI output.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (stage, duration) in &self.stages {
            out.push_str(&format!("  {stage:<14} {:>8} ms\n", duration.as_millis()));
        }
        out.push_str(&format!("  {:<14} {:>8} ms\n", "total", self.total().as_millis()));
        out
    }
}
