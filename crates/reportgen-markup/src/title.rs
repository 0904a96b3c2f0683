/// Title used when nothing printable is left.
pub const UNTITLED: &str = "Untitled";

/// Strip surrounding whitespace and any number of enclosing brace pairs.
///
/// The result is still literal text and must be escaped before it is used
/// inside a sectioning command.
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.trim();
    while cleaned.len() > 1 && cleaned.starts_with('{') && cleaned.ends_with('}') {
        cleaned = cleaned[1..cleaned.len() - 1].trim();
    }

    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned.to_string()
    }
}
