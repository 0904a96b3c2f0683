//! Title page.

use reportgen_markup::escape;

use crate::request::GenerationRequest;

fn people_block(label: &str, people: &[String]) -> String {
    let names = people
        .iter()
        .map(|p| format!("\\Large {}", escape(p)))
        .collect::<Vec<_>>()
        .join("\\\\ \n");
    format!("{{\\LARGE\\textbf{{{label}:}} \\par}}\n\\vspace{{0.5cm}}\n{names}\\par\n")
}

/// Render the `titlepage` environment.
///
/// `logo_file` is the name of the logo inside the document directory; every
/// request string is escaped here, so callers pass raw text.
pub fn render_cover(request: &GenerationRequest, logo_file: Option<&str>) -> String {
    let mut out = String::from("\\begin{titlepage}\n\\centering\n");

    if let Some(logo) = logo_file {
        out.push_str(&format!(
            "\\includegraphics[width=0.3\\textwidth,keepaspectratio]{{{logo}}}\n\\vspace{{1.5cm}}\n"
        ));
    }

    out.push_str(&format!(
        "{{\\Huge\\bfseries\\color{{primarycolor}} {} \\par}}\n\\vspace{{2.5cm}}\n",
        escape(&request.title)
    ));
    out.push_str(&people_block("Authors", &request.authors));

    if !request.mentors.is_empty() {
        out.push_str("\\vspace{1.5cm}\n");
        out.push_str(&people_block("Mentors", &request.mentors));
    }

    out.push_str("\\vfill\n");
    if let Some(university) = &request.university {
        out.push_str(&format!("{{\\Large {} \\par}}\n\\vspace{{0.5cm}}\n", escape(university)));
    }
    out.push_str(&format!("{{\\Large {} \\par}}\n", escape(&request.date)));
    out.push_str("\\end{titlepage}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RgbColor;
    use crate::request::RequestInput;

    fn request(mentors: Option<&str>, university: Option<&str>) -> GenerationRequest {
        GenerationRequest::from_input(
            RequestInput {
                query: "q".to_string(),
                title: "R&D in 100% Rust".to_string(),
                authors: "Ada Lovelace, Alan_Turing".to_string(),
                mentors: mentors.map(str::to_string),
                date: Some("May 01, 2025".to_string()),
                university: university.map(str::to_string),
                ..RequestInput::default()
            },
            RgbColor::DEFAULT,
        )
        .unwrap()
    }

    #[test]
    fn test_cover_escapes_strings() {
        let cover = render_cover(&request(None, Some("Univ. of A&B")), None);
        assert!(cover.contains(r"R\&D in 100\% Rust"));
        assert!(cover.contains("\\Large Ada Lovelace\\\\ \n\\Large Alan\\_Turing\\par"));
        assert!(cover.contains(r"{\Large Univ. of A\&B \par}"));
        assert!(cover.contains(r"{\Large May 01, 2025 \par}"));
    }

    #[test]
    fn test_optional_blocks() {
        let bare = render_cover(&request(None, None), None);
        assert!(!bare.contains("Mentors:"));
        assert!(!bare.contains("includegraphics"));

        let full = render_cover(&request(Some("Grace Hopper"), None), Some("logo.png"));
        assert!(full.contains(r"\textbf{Mentors:}"));
        assert!(full.contains(r"\includegraphics[width=0.3\textwidth,keepaspectratio]{logo.png}"));
        assert!(full.starts_with("\\begin{titlepage}\n\\centering\n\\includegraphics"));
        assert!(full.ends_with("\\end{titlepage}"));
    }
}
