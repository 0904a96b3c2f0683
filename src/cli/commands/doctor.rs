//! `reportgen doctor`: environment health checks.

use anyhow::{Context, Result};
use reportgen_config::Config;
use reportgen_doctor::{CheckStatus, DoctorCommand, DoctorOutput};
use reportgen_utils::exit_codes::ExitCode;

pub fn execute_doctor_command(json: bool, strict_exit: bool, config: &Config) -> Result<ExitCode> {
    let output = DoctorCommand::new(config.clone()).run(strict_exit);

    if json {
        let rendered =
            serde_json::to_string_pretty(&output).context("Failed to emit doctor JSON")?;
        println!("{rendered}");
    } else {
        print_report(&output);
        if !output.ok {
            println!();
            if strict_exit {
                println!("Some checks failed or warned (strict mode). Please address the issues above.");
            } else {
                println!("Some checks failed. Please address the issues above before generating reports.");
            }
        }
    }

    Ok(if output.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::INTERNAL
    })
}

fn print_report(output: &DoctorOutput) {
    println!("reportgen doctor");
    for check in &output.checks {
        let mark = match check.status {
            CheckStatus::Pass => "✓",
            CheckStatus::Warn => "⚠",
            CheckStatus::Fail => "✗",
        };
        println!("  {mark} {:<18} {}", check.name, check.details);
    }
}
