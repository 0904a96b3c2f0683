//! Line-oriented markdown to LaTeX conversion.
//!
//! Code fences are cut out first and emitted verbatim. Every other line is
//! classified into a [`LineKind`] and fed through a state machine whose only
//! state is whether an `itemize` environment is open.

use crate::inline::{InlineStyle, render_inline};

const FENCE: &str = "```";
const ITEMIZE_OPEN: &str = r"\begin{itemize}";
const ITEMIZE_CLOSE: &str = r"\end{itemize}";
const VERBATIM_OPEN: &str = r"\begin{verbatim}";
const VERBATIM_CLOSE: &str = r"\end{verbatim}";

/// Classification of one non-code line. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `#`, `##` or `###` followed by a space.
    Heading { level: u8, text: &'a str },
    /// `- ` or `* `.
    ListItem(&'a str),
    /// `> `.
    Quote(&'a str),
    Blank,
    Plain(&'a str),
}

/// Classify a line by its left-trimmed prefix.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim_start();

    for (prefix, level) in [("### ", 3), ("## ", 2), ("# ", 1)] {
        if let Some(text) = trimmed.strip_prefix(prefix) {
            return LineKind::Heading {
                level,
                text: text.trim(),
            };
        }
    }

    if let Some(text) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        return LineKind::ListItem(text.trim());
    }

    if let Some(text) = trimmed.strip_prefix("> ") {
        return LineKind::Quote(text.trim());
    }

    if trimmed.is_empty() {
        LineKind::Blank
    } else {
        LineKind::Plain(line.trim_end())
    }
}

enum Segment<'a> {
    Line(&'a str),
    Code(Vec<&'a str>),
}

/// Split input into ordinary lines and fenced code blocks.
///
/// A fence opens on a line starting with three backticks (an optional
/// language tag may follow) and closes on the next line starting with three
/// backticks. A fence that never closes is treated as ordinary text.
fn segments(raw: &str) -> Vec<Segment<'_>> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.trim_start().starts_with(FENCE) {
            let close = lines[i + 1..]
                .iter()
                .position(|l| l.trim_start().starts_with(FENCE))
                .map(|offset| i + 1 + offset);
            if let Some(close) = close {
                out.push(Segment::Code(lines[i + 1..close].to_vec()));
                i = close + 1;
                continue;
            }
        }
        out.push(Segment::Line(line));
        i += 1;
    }

    out
}

/// Keep code content from closing the environment early.
fn neutralize_verbatim(line: &str) -> String {
    line.replace(VERBATIM_CLOSE, r"\end {verbatim}")
}

struct Emitter {
    out: Vec<String>,
    in_list: bool,
}

impl Emitter {
    fn close_list(&mut self) {
        if self.in_list {
            self.out.push(ITEMIZE_CLOSE.to_string());
            self.in_list = false;
        }
    }

    fn line(&mut self, kind: LineKind<'_>) {
        match kind {
            LineKind::ListItem(text) => {
                if !self.in_list {
                    self.out.push(ITEMIZE_OPEN.to_string());
                    self.in_list = true;
                }
                self.out
                    .push(format!(r"  \item {}", render_inline(text, InlineStyle::Full)));
            }
            LineKind::Heading { level, text } => {
                self.close_list();
                let command = match level {
                    1 => "section*",
                    2 => "subsection*",
                    _ => "subsubsection*",
                };
                self.out.push(format!(
                    "\\{command}{{{}}}",
                    render_inline(text, InlineStyle::Full)
                ));
            }
            LineKind::Quote(text) => {
                self.close_list();
                self.out.push(format!(
                    r"\begin{{quote}}{}\end{{quote}}",
                    render_inline(text, InlineStyle::Full)
                ));
            }
            LineKind::Blank => {
                self.close_list();
                self.out.push(String::new());
            }
            LineKind::Plain(text) => {
                self.close_list();
                self.out.push(render_inline(text, InlineStyle::Full));
            }
        }
    }

    fn code(&mut self, lines: &[&str]) {
        self.close_list();
        self.out.push(VERBATIM_OPEN.to_string());
        self.out.extend(lines.iter().map(|l| neutralize_verbatim(l)));
        self.out.push(VERBATIM_CLOSE.to_string());
    }

    fn finish(mut self) -> String {
        self.close_list();
        self.out.join("\n")
    }
}

/// Convert model-written markdown into a LaTeX fragment.
///
/// Never fails: unrecognised constructs are escaped and rendered literally,
/// and every `itemize` that is opened is closed, including at end of input.
///
/// ```
/// use reportgen_markup::transform;
///
/// let out = transform("# Title\n- item one\n- item two\nplain text with 50% discount");
/// assert_eq!(
///     out,
///     "\\section*{Title}\n\\begin{itemize}\n  \\item item one\n  \\item item two\n\\end{itemize}\nplain text with 50\\% discount"
/// );
/// ```
pub fn transform(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut emitter = Emitter {
        out: Vec::new(),
        in_list: false,
    };

    for segment in segments(raw) {
        match segment {
            Segment::Line(line) => emitter.line(classify_line(line)),
            Segment::Code(lines) => emitter.code(&lines),
        }
    }

    emitter.finish()
}
