//! `reportgen outline`: run only the outline stage.

use anyhow::{Context, Result};
use reportgen_config::Config;
use reportgen_engine::generate_outline;
use reportgen_utils::exit_codes::ExitCode;

use super::model_client;

pub async fn execute_outline_command(query: &str, json: bool, config: &Config) -> Result<ExitCode> {
    let client = model_client(config)?;
    let outline = generate_outline(query, &client).await;

    if json {
        let rendered =
            serde_json::to_string_pretty(&outline.sections).context("Failed to emit outline JSON")?;
        println!("{rendered}");
    } else {
        for (i, section) in outline.sections.iter().enumerate() {
            println!("{}. {}", i + 1, section.title);
            for (j, sub) in section.subsections.iter().enumerate() {
                println!("   {}.{} {}", i + 1, j + 1, sub.title);
            }
        }
    }

    if outline.is_fallback() {
        eprintln!("⚠ The model's outline was unusable; showing the default outline");
    }
    Ok(ExitCode::SUCCESS)
}
