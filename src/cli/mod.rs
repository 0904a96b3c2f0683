//! Command-line interface for reportgen
//!
//! - `args`: clap definitions
//! - `run`: entry point, configuration, runtime and error reporting
//! - `commands`: one module per subcommand

pub mod args;
mod commands;
mod run;

#[cfg(test)]
mod tests;

pub use args::{Cli, Commands};
pub use run::run;
