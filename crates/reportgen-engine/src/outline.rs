//! Section structure for a report.
//!
//! One model call asks for a JSON array of `{title, subsections?}` objects.
//! The response is cleaned, parsed and validated; when nothing usable
//! survives, a fixed six-section outline is used instead.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::{GenerationFailure, TextGenerator};

/// A section and its (single level of) subsections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<Section>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subsections: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_subsections<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subsections = titles.into_iter().map(Section::new).collect();
        self
    }
}

/// Why the default outline was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineFallbackReason {
    ModelFailure(GenerationFailure),
    InvalidJson(String),
    NotAnArray,
    NoValidSections,
}

impl fmt::Display for OutlineFallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelFailure(e) => write!(f, "model call failed: {e}"),
            Self::InvalidJson(e) => write!(f, "response is not valid JSON: {e}"),
            Self::NotAnArray => f.write_str("response is not a JSON array"),
            Self::NoValidSections => f.write_str("no valid sections after validation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineOrigin {
    Model,
    Fallback(OutlineFallbackReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub sections: Vec<Section>,
    pub origin: OutlineOrigin,
}

impl Outline {
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, OutlineOrigin::Fallback(_))
    }
}

/// The outline used whenever the model's answer cannot be used.
pub fn default_outline() -> Vec<Section> {
    vec![
        Section::new("Introduction").with_subsections(["Background", "Objectives"]),
        Section::new("Literature Review"),
        Section::new("Methodology"),
        Section::new("Results"),
        Section::new("Discussion"),
        Section::new("Conclusion"),
    ]
}

pub fn outline_prompt(topic: &str) -> String {
    format!(
        r#"Based on the following report description, create a table of contents with main sections and optional subsections.
Return ONLY a JSON array of sections. Each section object must have a "title" (string) and an optional "subsections" (array of strings or array of objects with a "title" field).

RULES FOR TITLES:
- Titles must be plain text strings.
- Do not put special characters such as '/', '\', '%', '$', '#', '_', '^', '~', '<', '>' or any formatting or LaTeX commands in titles. A title should be "Introduction", not "{{Introduction}}".
- Keep titles concise and relevant to the report description.
- Do not generate sections for "Abstract", "Acknowledgements", "References" or "Appendices"; those are handled separately.

Use 5-7 main sections. Every main section must have a unique title.

REPORT DESCRIPTION:
{topic}

EXAMPLE RESPONSE (return only JSON like this, with no explanation or other text):
[
  {{"title": "Introduction", "subsections": ["Background", "Project Objectives", "Scope of Report"]}},
  {{"title": "Literature Review"}},
  {{"title": "Methodology", "subsections": [{{"title": "Data Collection"}}, {{"title": "System Architecture"}}]}},
  {{"title": "Results and Analysis"}},
  {{"title": "Discussion"}},
  {{"title": "Conclusion and Future Work", "subsections": ["Summary of Findings", "Limitations"]}}
]"#
    )
}

/// Strip a surrounding code fence and trailing prose after the last `]`/`}`.
pub fn clean_outline_response(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest.trim();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }

    let end = match (text.rfind(']'), text.rfind('}')) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    if let Some(end) = end {
        let after = text[end + 1..].trim();
        if !after.is_empty() && !after.starts_with(',') {
            debug!(trailing = after, "Trimming trailing text after outline JSON");
            text = &text[..=end];
        }
    }

    text
}

/// Parse and validate a cleaned response.
///
/// Titles are trimmed; blank titles, non-object sections and duplicate
/// titles (exact match among siblings) are dropped. Subsections may be
/// strings or `{title}` objects; anything nested deeper is ignored.
pub fn parse_outline(text: &str) -> Result<Vec<Section>, OutlineFallbackReason> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| OutlineFallbackReason::InvalidJson(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(OutlineFallbackReason::NotAnArray);
    };

    let mut seen = HashSet::new();
    let mut sections = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let Some(title) = item.get("title").and_then(Value::as_str).map(str::trim) else {
            warn!(index = idx, "Outline entry without a string title, skipping");
            continue;
        };
        if title.is_empty() {
            warn!(index = idx, "Outline entry with an empty title, skipping");
            continue;
        }
        if !seen.insert(title.to_string()) {
            warn!(title, "Duplicate section title skipped");
            continue;
        }

        let subsections = item
            .get("subsections")
            .and_then(Value::as_array)
            .map(|subs| parse_subsections(title, subs))
            .unwrap_or_default();

        sections.push(Section {
            title: title.to_string(),
            subsections,
        });
    }

    if sections.is_empty() {
        return Err(OutlineFallbackReason::NoValidSections);
    }
    Ok(sections)
}

fn parse_subsections(parent: &str, items: &[Value]) -> Vec<Section> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim()),
            Value::Object(_) => item.get("title").and_then(Value::as_str).map(str::trim),
            _ => None,
        })
        .filter(|t| !t.is_empty())
        .filter(|t| {
            let fresh = seen.insert(t.to_string());
            if !fresh {
                warn!(section = parent, subsection = *t, "Duplicate subsection title skipped");
            }
            fresh
        })
        .map(Section::new)
        .collect()
}

/// Ask the model for an outline, falling back to [`default_outline`].
pub async fn generate_outline(topic: &str, generator: &dyn TextGenerator) -> Outline {
    let result = match generator.generate(&outline_prompt(topic)).await {
        Ok(raw) => parse_outline(clean_outline_response(&raw)),
        Err(failure) => Err(OutlineFallbackReason::ModelFailure(failure)),
    };

    match result {
        Ok(sections) => {
            info!(sections = sections.len(), "Generated outline");
            Outline {
                sections,
                origin: OutlineOrigin::Model,
            }
        }
        Err(reason) => {
            warn!(reason = %reason, "Using default outline");
            Outline {
                sections: default_outline(),
                origin: OutlineOrigin::Fallback(reason),
            }
        }
    }
}
