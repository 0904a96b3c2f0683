//! Command implementations, one module per subcommand.

mod convert;
mod doctor;
mod generate;
mod outline;

pub use convert::execute_convert_command;
pub use doctor::execute_doctor_command;
pub use generate::execute_generate_command;
pub use outline::execute_outline_command;

use reportgen_config::Config;
use reportgen_llm::{LlmFallbackInfo, ModelClient};
use reportgen_utils::error::ReportError;

/// Build the model client, reporting a provider fallback on stderr.
///
/// A missing or unusable provider is fatal for the command.
pub(crate) fn model_client(config: &Config) -> Result<ModelClient, ReportError> {
    let (client, fallback) = reportgen_llm::client_from_config(config)?;
    if let Some(LlmFallbackInfo {
        primary_provider,
        fallback_provider,
        reason,
    }) = fallback
    {
        eprintln!("⚠ {primary_provider} unavailable ({reason}); using {fallback_provider}");
    }
    Ok(client)
}
