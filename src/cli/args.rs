//! CLI argument definitions (clap derive).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use reportgen_engine::RequestInput;

/// reportgen - write a typeset report about a topic with a language model
#[derive(Parser, Debug)]
#[command(name = "reportgen")]
#[command(about = "Generate LaTeX/PDF reports with a language model")]
#[command(long_about = r#"
reportgen asks a language model for an outline, section text, a bibliography
and an optional appendix, turns the model's markdown into LaTeX, and compiles
the document with pdflatex. If compilation fails the .tex source is kept.

EXAMPLES:
  # Generate a report
  reportgen generate --title "Soil Erosion" --query "causes and control of soil erosion" \
      --authors "Kim Lee, Sam Ortiz" --logo crest.png

  # Preview the outline only
  reportgen outline --query "quantum error correction" --json

  # Convert markdown to LaTeX without a model
  reportgen convert notes.md

  # Check the environment
  reportgen doctor

CONFIGURATION:
  Precedence: CLI flags > REPORTGEN_* environment > config file > defaults
  The config file is found by searching upward from CWD for .reportgen/config.toml
  API keys are read from GOOGLE_API_KEY / GEMINI_API_KEY, ANTHROPIC_API_KEY
  or OPENROUTER_API_KEY depending on the provider
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Model provider: gemini, anthropic or openrouter
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model to use for the active provider
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Directory that receives report workspaces
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a complete report
    Generate(GenerateArgs),

    /// Generate and print only the outline
    Outline {
        /// Report topic
        #[arg(long)]
        query: String,

        /// Print the outline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert markdown to LaTeX (reads stdin when no file is given)
    Convert {
        /// Markdown file
        file: Option<PathBuf>,
    },

    /// Run environment health checks
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Treat warnings as failures
        #[arg(long)]
        strict_exit: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Report title
    #[arg(long)]
    pub title: String,

    /// Topic or description the model writes about
    #[arg(long)]
    pub query: String,

    /// Comma-separated author names
    #[arg(long)]
    pub authors: String,

    /// Comma-separated mentor names
    #[arg(long)]
    pub mentors: Option<String>,

    /// Cover date (default: today)
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub university: Option<String>,

    /// Theme colour as "R, G, B"
    #[arg(long)]
    pub color: Option<String>,

    /// Logo image for the cover
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Image placed before the first section
    #[arg(long)]
    pub figure: Option<PathBuf>,

    #[arg(long)]
    pub figure_caption: Option<String>,
}

impl From<GenerateArgs> for RequestInput {
    fn from(args: GenerateArgs) -> Self {
        RequestInput {
            query: args.query,
            title: args.title,
            authors: args.authors,
            mentors: args.mentors,
            date: args.date,
            university: args.university,
            color: args.color,
            logo: args.logo,
            figure: args.figure,
            figure_caption: args.figure_caption,
        }
    }
}
