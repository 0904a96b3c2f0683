//! Property tests for the markdown to LaTeX transformer.
//!
//! Case count comes from `PROPTEST_CASES` (default: 64).

use proptest::prelude::*;
use reportgen_markup::{LineKind, classify_line, escape, transform};

fn config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(64);
    ProptestConfig::with_cases(cases)
}

/// Lines built from the markdown subset plus hostile characters. Backticks
/// are left out so no verbatim block can carry raw text through.
fn markdown_line() -> impl Strategy<Value = String> {
    let body = "[A-Za-z0-9 *_%$&#{}~^<>\\\\.,-]{0,24}";
    prop_oneof![
        body.prop_map(|s| s),
        body.prop_map(|s| format!("- {s}")),
        body.prop_map(|s| format!("* {s}")),
        body.prop_map(|s| format!("# {s}")),
        body.prop_map(|s| format!("## {s}")),
        body.prop_map(|s| format!("### {s}")),
        body.prop_map(|s| format!("> {s}")),
        Just(String::new()),
    ]
}

fn markdown_document() -> impl Strategy<Value = String> {
    prop::collection::vec(markdown_line(), 0..20).prop_map(|lines| lines.join("\n"))
}

/// Every occurrence of `ch` must directly follow a backslash.
fn all_escaped(out: &str, ch: char) -> bool {
    let chars: Vec<char> = out.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == ch)
        .all(|(i, _)| i > 0 && chars[i - 1] == '\\')
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn prop_list_environments_balance(doc in markdown_document()) {
        let out = transform(&doc);
        prop_assert_eq!(
            out.matches(r"\begin{itemize}").count(),
            out.matches(r"\end{itemize}").count()
        );
    }

    #[test]
    fn prop_lists_never_nest(doc in markdown_document()) {
        let out = transform(&doc);
        let mut depth = 0i32;
        for line in out.lines() {
            if line == r"\begin{itemize}" {
                depth += 1;
            } else if line == r"\end{itemize}" {
                depth -= 1;
            }
            prop_assert!((0..=1).contains(&depth));
        }
        prop_assert_eq!(depth, 0);
    }

    #[test]
    fn prop_unsafe_characters_are_escaped(doc in markdown_document()) {
        let out = transform(&doc);
        for ch in ['%', '$', '_', '&', '#'] {
            prop_assert!(all_escaped(&out, ch), "unescaped {:?} in {:?}", ch, out);
        }
    }

    #[test]
    fn prop_plain_lines_are_escaped_verbatim(s in "[A-Za-z0-9][A-Za-z0-9 %$_&#.,]{0,40}") {
        // No markdown markers: a single plain line round-trips through the escaper.
        prop_assume!(matches!(classify_line(&s), LineKind::Plain(_)));
        prop_assert_eq!(transform(&s), escape(s.trim_end()));
    }

    #[test]
    fn prop_transform_is_deterministic(doc in markdown_document()) {
        prop_assert_eq!(transform(&doc), transform(&doc));
    }
}

#[test]
fn end_to_end_heading_list_paragraph() {
    let out = transform("# Title\n- item one\n- item two\nplain text with 50% discount");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            r"\section*{Title}",
            r"\begin{itemize}",
            r"  \item item one",
            r"  \item item two",
            r"\end{itemize}",
            r"plain text with 50\% discount",
        ]
    );
}
