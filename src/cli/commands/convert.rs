//! `reportgen convert`: markdown to LaTeX without a model.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use reportgen_utils::exit_codes::ExitCode;

pub fn execute_convert_command(file: Option<&Path>) -> Result<ExitCode> {
    let markdown = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read markdown from stdin")?;
            buf
        }
    };

    println!("{}", reportgen_markup::transform(&markdown));
    Ok(ExitCode::SUCCESS)
}
