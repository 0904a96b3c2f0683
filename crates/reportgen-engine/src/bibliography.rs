//! Reference list.
//!
//! The model is asked for `\bibitem{key}` entries. Whatever precedes the
//! first marker is dropped, each entry body is escaped with only italic
//! markdown honoured, and the entries are wrapped in a `thebibliography`
//! environment.

use once_cell::sync::Lazy;
use regex::Regex;
use reportgen_markup::{InlineStyle, render_inline};
use tracing::{info, warn};

use crate::llm::TextGenerator;

/// Used when the model gives no usable entry.
pub const FALLBACK_ENTRY: &str = r"\bibitem{unavailable} Error generating bibliography.";

static BIBITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\bibitem\{([^{}]*)\}").expect("bibitem pattern is valid"));

pub fn bibliography_prompt(topic: &str) -> String {
    format!(
        "You are an academic assistant. Generate a list of 5-7 complete bibliography entries for a report on \"{topic}\".\n\
         CRITICAL FORMATTING RULES:\n\
         1. Each entry MUST start on a new line with `\\bibitem{{key}}`.\n\
         2. The key MUST be a simple alphanumeric identifier (e.g. `Vaswani2017`).\n\
         3. The full citation text MUST follow the key on the same entry.\n\
         4. Use simple markdown for italics (`*Title*`). DO NOT use any other LaTeX commands.\n\
         EXAMPLE:\n\
         \\bibitem{{Vaswani2017}} Vaswani, A., et al. (2017). *Attention Is All You Need*. Advances in Neural Information Processing Systems.\n\
         \\bibitem{{LeCun2015}} LeCun, Y., Bengio, Y., & Hinton, G. (2015). *Deep learning*. Nature, 521(7553), 436-444."
    )
}

/// One parsed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    /// Alphanumeric citation key.
    pub key: String,
    /// Raw citation text, whitespace-normalised but not yet escaped.
    pub body: String,
}

impl BibEntry {
    pub fn render(&self) -> String {
        format!(
            "\\bibitem{{{}}} {}",
            self.key,
            render_inline(&self.body, InlineStyle::ItalicOnly)
        )
    }
}

/// Split raw model text into entries.
///
/// Text before the first marker is discarded. An entry body runs up to the
/// next marker; its lines are trimmed and joined with single spaces. Entries
/// whose body is empty are dropped. Keys are reduced to ASCII alphanumerics,
/// and a key with nothing left becomes `ref<n>` (1-based position).
pub fn extract_entries(raw: &str) -> Vec<BibEntry> {
    let markers: Vec<_> = BIBITEM.captures_iter(raw).collect();
    let mut entries = Vec::with_capacity(markers.len());

    for (index, captures) in markers.iter().enumerate() {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let end = markers
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map_or(raw.len(), |m| m.start());

        let body = raw[whole.end()..end]
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if body.is_empty() {
            continue;
        }

        let mut key: String = key
            .as_str()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if key.is_empty() {
            key = format!("ref{}", index + 1);
        }
        entries.push(BibEntry { key, body });
    }

    entries
}

/// The rendered bibliography and whether it is the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bibliography {
    pub latex: String,
    pub entries: usize,
}

impl Bibliography {
    pub fn is_fallback(&self) -> bool {
        self.entries == 0
    }
}

fn wrap(items: &str) -> String {
    format!(
        "\\addcontentsline{{toc}}{{section}}{{References}}\n\\begin{{thebibliography}}{{99}}\n{items}\n\\end{{thebibliography}}"
    )
}

/// Ask the model for references. Never fails: a model failure or a
/// response without markers yields [`FALLBACK_ENTRY`].
pub async fn generate_bibliography(topic: &str, generator: &dyn TextGenerator) -> Bibliography {
    let entries = match generator.generate(&bibliography_prompt(topic)).await {
        Ok(raw) => {
            let entries = extract_entries(&raw);
            if entries.is_empty() {
                warn!("Bibliography response contained no entries");
            }
            entries
        }
        Err(failure) => {
            warn!(error = %failure, "Could not generate bibliography");
            Vec::new()
        }
    };

    if entries.is_empty() {
        return Bibliography {
            latex: wrap(FALLBACK_ENTRY),
            entries: 0,
        };
    }

    info!(entries = entries.len(), "Generated bibliography");
    let items = entries
        .iter()
        .map(BibEntry::render)
        .collect::<Vec<_>>()
        .join("\n");
    Bibliography {
        latex: wrap(&items),
        entries: entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationFailure;
    use crate::llm::test_support::ScriptedGenerator;

    #[test]
    fn test_preamble_discarded_and_order_kept() {
        let entries = extract_entries(
            "Sure, here it is:\n\\bibitem{A2020}\nBody one.\n\\bibitem{B2021}\nBody two.",
        );
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["A2020", "B2021"]);
        assert_eq!(entries[0].body, "Body one.");
        assert!(entries.iter().all(|e| !e.body.contains("Sure")));
    }

    #[test]
    fn test_multiline_body_is_joined() {
        let entries = extract_entries("\\bibitem{K1} Smith, J.\n   (2020).\n\n *Book*.");
        assert_eq!(entries[0].body, "Smith, J. (2020). *Book*.");
    }

    #[test]
    fn test_empty_bodies_dropped() {
        let entries = extract_entries("\\bibitem{Empty}\n\n\\bibitem{Full} Text");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "Full");
    }

    #[test]
    fn test_keys_sanitised() {
        let entries = extract_entries("\\bibitem{Doe_2019!} a\n\\bibitem{__} b");
        assert_eq!(entries[0].key, "Doe2019");
        assert_eq!(entries[1].key, "ref2");
    }

    #[test]
    fn test_render_escapes_and_keeps_italic_only() {
        let entry = BibEntry {
            key: "X1".to_string(),
            body: "Lee & Kim. *Deep Nets*, 100% `raw`".to_string(),
        };
        assert_eq!(
            entry.render(),
            r"\bibitem{X1} Lee \& Kim. \textit{Deep Nets}, 100\% `raw`"
        );
    }

    #[tokio::test]
    async fn test_no_markers_gives_fallback() {
        let generator = ScriptedGenerator::from_responses(["Here are some great books to read."]);
        let bib = generate_bibliography("topic", &generator).await;
        assert!(bib.is_fallback());
        assert!(bib.latex.contains(FALLBACK_ENTRY));
        assert!(bib.latex.starts_with(r"\addcontentsline{toc}{section}{References}"));
        assert!(bib.latex.ends_with(r"\end{thebibliography}"));
    }

    #[tokio::test]
    async fn test_model_failure_gives_fallback() {
        let generator =
            ScriptedGenerator::failing(GenerationFailure::Transient("503".to_string()));
        let bib = generate_bibliography("topic", &generator).await;
        assert!(bib.is_fallback());
    }

    #[tokio::test]
    async fn test_entries_rendered_in_order() {
        let generator = ScriptedGenerator::from_responses([
            "\\bibitem{A1} First *Title*.\n\\bibitem{B2} Second.",
        ]);
        let bib = generate_bibliography("neural nets", &generator).await;
        assert_eq!(bib.entries, 2);
        assert!(bib.latex.contains("\\bibitem{A1} First \\textit{Title}.\n\\bibitem{B2} Second."));
        assert!(generator.prompts()[0].contains("\"neural nets\""));
    }
}
