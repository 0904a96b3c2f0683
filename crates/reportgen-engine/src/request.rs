//! Report parameters.

use std::path::PathBuf;

use chrono::Local;
use tracing::warn;

use crate::config::RgbColor;
use crate::error::{ConfigError, ReportError};

/// Date format used on the cover when no date is given, e.g. "March 04, 2025".
pub const DATE_FORMAT: &str = "%B %d, %Y";

/// Request fields as the user typed them.
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    pub query: String,
    pub title: String,
    /// Comma-separated.
    pub authors: String,
    /// Comma-separated.
    pub mentors: Option<String>,
    pub date: Option<String>,
    pub university: Option<String>,
    /// `"R, G, B"`.
    pub color: Option<String>,
    pub logo: Option<PathBuf>,
    pub figure: Option<PathBuf>,
    pub figure_caption: Option<String>,
}

/// Validated report parameters. Immutable once generation starts.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub query: String,
    pub title: String,
    pub authors: Vec<String>,
    pub mentors: Vec<String>,
    pub date: String,
    pub university: Option<String>,
    pub color: RgbColor,
    pub logo: Option<PathBuf>,
    pub figure: Option<PathBuf>,
    pub figure_caption: Option<String>,
}

impl GenerationRequest {
    /// Normalise raw input.
    ///
    /// An unparsable colour is replaced by `default_color` rather than
    /// rejected; a missing date becomes today's date.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when the title or query is blank.
    pub fn from_input(input: RequestInput, default_color: RgbColor) -> Result<Self, ReportError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ConfigError::MissingRequired("title".to_string()).into());
        }
        let query = input.query.trim().to_string();
        if query.is_empty() {
            return Err(ConfigError::MissingRequired("query".to_string()).into());
        }

        let color = match input.color.as_deref().map(str::trim) {
            None | Some("") => default_color,
            Some(raw) => raw.parse::<RgbColor>().unwrap_or_else(|e| {
                warn!(color = raw, error = %e, fallback = %default_color, "Invalid colour, using default");
                default_color
            }),
        };

        let date = input
            .date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(today);

        Ok(Self {
            query,
            title,
            authors: parse_people(&input.authors),
            mentors: input.mentors.as_deref().map(parse_people).unwrap_or_default(),
            date,
            university: non_blank(input.university),
            color,
            logo: input.logo,
            figure: input.figure,
            figure_caption: non_blank(input.figure_caption),
        })
    }
}

/// Split a comma-separated list of names, dropping blanks.
pub fn parse_people(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}
