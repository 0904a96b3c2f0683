use clap::{CommandFactory, Parser};

use super::args::{Cli, Commands};
use reportgen_engine::RequestInput;

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_generate_args_become_request_input() {
    let cli = Cli::try_parse_from([
        "reportgen",
        "generate",
        "--title",
        "Soil",
        "--query",
        "soil erosion",
        "--authors",
        "A, B",
        "--color",
        "1, 2, 3",
        "--logo",
        "crest.png",
    ])
    .unwrap();

    let Commands::Generate(args) = cli.command else {
        panic!("expected generate");
    };
    let input: RequestInput = args.into();
    assert_eq!(input.title, "Soil");
    assert_eq!(input.authors, "A, B");
    assert_eq!(input.color.as_deref(), Some("1, 2, 3"));
    assert_eq!(input.logo.as_deref(), Some(std::path::Path::new("crest.png")));
    assert!(input.mentors.is_none());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "reportgen",
        "outline",
        "--query",
        "q",
        "--provider",
        "anthropic",
        "-v",
        "--output-dir",
        "out",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.provider.as_deref(), Some("anthropic"));
    assert_eq!(cli.output_dir.as_deref(), Some(std::path::Path::new("out")));
}

#[test]
fn test_generate_requires_title_query_authors() {
    assert!(Cli::try_parse_from(["reportgen", "generate", "--title", "T"]).is_err());
}
