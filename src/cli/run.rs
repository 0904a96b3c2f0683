//! CLI entry point and dispatch.
//!
//! `run()` parses arguments, sets up logging, discovers configuration,
//! creates the tokio runtime, dispatches, and prints every error.

use clap::Parser;

use reportgen_config::{CliArgs, Config};
use reportgen_utils::error::ReportError;
use reportgen_utils::exit_codes::ExitCode;
use reportgen_utils::logging::{LogFormat, init_tracing};

use super::args::{Cli, Commands};
use super::commands;

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after the error has been printed; main.rs only
/// exits with it.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if let Err(e) = init_tracing(cli.verbose, format) {
        eprintln!("⚠ Logging disabled: {e}");
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        llm_provider: cli.provider.clone(),
        model: cli.model.clone(),
        output_dir: cli.output_dir.clone(),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(&err)),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Generate(args) => {
                commands::execute_generate_command(args.into(), &config, cli.verbose).await
            }
            Commands::Outline { query, json } => {
                commands::execute_outline_command(&query, json, &config).await
            }
            Commands::Convert { file } => commands::execute_convert_command(file.as_deref()),
            Commands::Doctor { json, strict_exit } => {
                commands::execute_doctor_command(json, strict_exit, &config)
            }
        }
    });

    match result {
        Ok(ExitCode::SUCCESS) => Ok(()),
        Ok(code) => Err(code),
        Err(err) => Err(report_error(&err)),
    }
}

/// Print `err` for the user and pick the exit code.
fn report_error(err: &anyhow::Error) -> ExitCode {
    if let Some(report_error) = err.downcast_ref::<ReportError>() {
        eprint!("{}", report_error.display_for_user());
        return report_error.to_exit_code();
    }

    eprintln!("✗ {err:#}");
    eprintln!("\n  Run with --verbose for more detailed output");
    ExitCode::INTERNAL
}
