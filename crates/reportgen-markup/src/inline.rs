//! Inline spans: bold, italic and code.
//!
//! Delimiters and literal text are never escaped in the same pass. Each
//! recognised span is swapped for a private-use placeholder, the remaining
//! text is escaped, and the placeholders are then expanded into commands
//! wrapping their separately escaped content.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::escape::escape;

const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+?)`").expect("code pattern is valid"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").expect("italic pattern is valid"));
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").expect("placeholder pattern is valid"));

/// Which inline constructs are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineStyle {
    /// Code, bold and italic, in that order.
    #[default]
    Full,
    /// Italic only; used for citation bodies.
    ItalicOnly,
}

/// Escape a single line, turning recognised inline spans into commands.
///
/// ```
/// use reportgen_markup::{InlineStyle, render_inline};
///
/// assert_eq!(
///     render_inline("**Key** result: 50% *faster*", InlineStyle::Full),
///     r"\textbf{Key} result: 50\% \textit{faster}"
/// );
/// ```
pub fn render_inline(text: &str, style: InlineStyle) -> String {
    // Input may not smuggle in its own placeholders.
    let text: String = text.chars().filter(|c| *c != OPEN && *c != CLOSE).collect();

    let rules = match style {
        InlineStyle::Full => vec![
            Rule::new(&CODE, "texttt", false),
            Rule::new(&BOLD, "textbf", true),
            Rule::new(&ITALIC, "textit", false),
        ],
        InlineStyle::ItalicOnly => vec![Rule::new(&ITALIC, "textit", false)],
    };

    let mut spans = Vec::new();
    let stashed = stash(&text, &rules, &mut spans);
    restore(&escape(&stashed), &spans)
}

struct Rule {
    pattern: &'static Regex,
    command: &'static str,
    /// Whether the later rules apply inside this span.
    nested: bool,
}

impl Rule {
    fn new(pattern: &'static Lazy<Regex>, command: &'static str, nested: bool) -> Self {
        Self {
            pattern: Lazy::force(pattern),
            command,
            nested,
        }
    }
}

/// Replace every match of the first rule with a placeholder, then hand the
/// result to the remaining rules.
fn stash(text: &str, rules: &[Rule], spans: &mut Vec<String>) -> String {
    let Some((rule, rest)) = rules.split_first() else {
        return text.to_string();
    };

    let replaced = rule
        .pattern
        .replace_all(text, |caps: &Captures| {
            let inner = if rule.nested {
                stash(&caps[1], rest, spans)
            } else {
                caps[1].to_string()
            };
            spans.push(format!("\\{}{{{}}}", rule.command, escape(&inner)));
            format!("{OPEN}{}{CLOSE}", spans.len() - 1)
        })
        .into_owned();

    stash(&replaced, rest, spans)
}

/// Expand placeholders. A span may contain placeholders of spans stashed
/// before it, so expansion recurses towards lower indices only.
fn restore(text: &str, spans: &[String]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| spans.get(idx).map(|span| restore(span, &spans[..idx])))
                .unwrap_or_default()
        })
        .into_owned()
}
