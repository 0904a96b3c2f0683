//! Whole-document assembly.

use reportgen_markup::escape;

use crate::config::RgbColor;

/// The fragments of one report, each already valid LaTeX.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    pub cover: String,
    pub body: String,
    pub bibliography: String,
    pub appendix: Option<String>,
}

/// Packages, page geometry, and the `primarycolor` theme.
pub fn preamble(title: &str, color: RgbColor) -> String {
    format!(
        r"\documentclass[11pt,a4paper]{{article}}
\usepackage[utf8]{{inputenc}}
\usepackage[T1]{{fontenc}}
\usepackage{{lmodern}}
\usepackage{{textcomp}}
\usepackage{{graphicx}}
\usepackage{{amsmath,amssymb}}
\usepackage{{xcolor}}
\usepackage{{geometry}}
\usepackage{{hyperref}}
\usepackage{{sectsty}}
\usepackage{{url}}
\usepackage{{booktabs}}
\usepackage{{float}}
\geometry{{margin=1in}}
\urlstyle{{same}}
\definecolor{{primarycolor}}{{RGB}}{{{},{},{}}}
\hypersetup{{colorlinks=true, linkcolor=primarycolor, urlcolor=primarycolor, pdftitle={{{}}}}}
\sectionfont{{\color{{primarycolor}}\Large\bfseries}}
\subsectionfont{{\color{{primarycolor}}\large\bfseries}}",
        color.r,
        color.g,
        color.b,
        escape(title)
    )
}

/// Concatenate the preamble and fragments in document order.
pub fn assemble(title: &str, color: RgbColor, parts: &DocumentParts) -> String {
    let mut blocks = vec![
        preamble(title, color),
        r"\begin{document}".to_string(),
        parts.cover.clone(),
        "\\tableofcontents\n\\newpage".to_string(),
        parts.body.clone(),
        r"\clearpage".to_string(),
        parts.bibliography.clone(),
    ];
    blocks.extend(parts.appendix.clone());
    blocks.push(r"\end{document}".to_string());

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}
