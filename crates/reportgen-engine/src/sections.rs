//! Section bodies.

use std::time::Duration;

use reportgen_markup::{clean_title, escape, transform};
use tracing::{debug, error};

use crate::llm::TextGenerator;
use crate::outline::Section;

/// Rendered in place of a section whose text could not be generated.
pub const SECTION_FAILURE_MARKER: &str =
    r"\textbf{Error: Could not generate content for this section.}";

pub fn section_prompt(topic: &str, title: &str) -> String {
    format!(
        "You are an academic writer for a LaTeX report on: \"{topic}\". Write the content for the section: \"{title}\".\n\
         INSTRUCTIONS: Use simple markdown for formatting (`**bold**`, `*italic*`, `- list item`). \
         DO NOT use any raw LaTeX commands. Write only the body text."
    )
}

/// Generate and convert the text of one section.
///
/// Returns the fragment and whether the model call failed; a failure yields
/// [`SECTION_FAILURE_MARKER`] instead of an error.
pub async fn generate_section(
    title: &str,
    topic: &str,
    generator: &dyn TextGenerator,
) -> (String, bool) {
    match generator.generate(&section_prompt(topic, title)).await {
        Ok(raw) => (transform(&raw), false),
        Err(failure) => {
            error!(section = title, error = %failure, "Could not generate section content");
            (SECTION_FAILURE_MARKER.to_string(), true)
        }
    }
}

/// The report body and how many of its prompts failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub latex: String,
    pub calls: usize,
    pub failures: usize,
}

/// Generate every section and subsection in document order.
///
/// Subsection prompts name the parent as `"Parent - Child"`. `pacing` is
/// slept before every model call except the first. A figure block, if any,
/// precedes the first section.
pub async fn generate_body(
    sections: &[Section],
    topic: &str,
    generator: &dyn TextGenerator,
    pacing: Duration,
    figure: Option<String>,
) -> Body {
    let mut parts: Vec<String> = figure.into_iter().collect();
    let mut pacer = PacedCalls {
        generator,
        topic,
        pacing,
        calls: 0,
        failures: 0,
    };

    for section in sections {
        let title = clean_title(&section.title);
        parts.push(format!("\\section{{{}}}", escape(&title)));
        parts.push(pacer.section(&title).await);

        for sub in &section.subsections {
            let sub_title = clean_title(&sub.title);
            parts.push(format!("\\subsection{{{}}}", escape(&sub_title)));
            parts.push(pacer.section(&format!("{title} - {sub_title}")).await);
        }
    }

    Body {
        latex: parts.join("\n\n"),
        calls: pacer.calls,
        failures: pacer.failures,
    }
}

struct PacedCalls<'a> {
    generator: &'a dyn TextGenerator,
    topic: &'a str,
    pacing: Duration,
    calls: usize,
    failures: usize,
}

impl PacedCalls<'_> {
    async fn section(&mut self, title: &str) -> String {
        if self.calls > 0 && !self.pacing.is_zero() {
            debug!(delay_ms = self.pacing.as_millis() as u64, "Pacing before next section");
            tokio::time::sleep(self.pacing).await;
        }
        self.calls += 1;

        let (latex, failed) = generate_section(title, self.topic, self.generator).await;
        if failed {
            self.failures += 1;
        }
        latex
    }
}
