//! User-supplied figure.

use reportgen_markup::escape;

pub const DEFAULT_CAPTION: &str = "User-provided figure.";

const LABEL_LIMIT: usize = 20;

/// `fig:` followed by the alphanumerics of `basename`, at most 20 of them.
pub fn figure_label(basename: &str) -> String {
    let label: String = basename
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(LABEL_LIMIT)
        .collect();
    format!("fig:{label}")
}

/// A floating `figure` block for the image `basename` in the document directory.
pub fn render_figure(basename: &str, caption: Option<&str>) -> String {
    let caption = caption
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CAPTION);
    format!(
        "\\begin{{figure}}[htbp]\n\\centering\n\\includegraphics[width=0.8\\textwidth]{{{basename}}}\n\\caption{{{}}}\n\\label{{{}}}\n\\end{{figure}}",
        escape(caption),
        figure_label(basename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_truncated_alphanumerics() {
        assert_eq!(figure_label("plot_1.png"), "fig:plot1png");
        assert_eq!(
            figure_label("a_very_long_figure_file_name_here.png"),
            "fig:averylongfigurefilen"
        );
    }

    #[test]
    fn test_caption_escaped_or_defaulted() {
        let block = render_figure("chart.png", Some("Growth of 50% & more"));
        assert!(block.contains(r"\caption{Growth of 50\% \& more}"));
        assert!(block.contains(r"\includegraphics[width=0.8\textwidth]{chart.png}"));

        let block = render_figure("chart.png", Some("  "));
        assert!(block.contains(r"\caption{User-provided figure.}"));
        assert!(block.starts_with("\\begin{figure}[htbp]"));
    }
}
