//! Literal-text escaping.

/// Characters that have a control meaning in LaTeX body text.
pub const SPECIAL_CHARS: &[char] = &[
    '\\', '&', '%', '$', '#', '_', '{', '}', '~', '^', '<', '>',
];

fn replacement(ch: char) -> Option<&'static str> {
    let escaped = match ch {
        '\\' => r"\textbackslash{}",
        '&' => r"\&",
        '%' => r"\%",
        '$' => r"\$",
        '#' => r"\#",
        '_' => r"\_",
        '{' => r"\{",
        '}' => r"\}",
        '~' => r"\textasciitilde{}",
        '^' => r"\textasciicircum{}",
        '<' => r"\textless{}",
        '>' => r"\textgreater{}",
        _ => return None,
    };
    Some(escaped)
}

/// Escape `text` so that it renders literally.
///
/// Every character is looked at exactly once, so the backslashes and braces
/// introduced by a replacement are never themselves re-escaped. Applying this
/// twice to the same span double-escapes it.
///
/// ```
/// use reportgen_markup::escape;
///
/// assert_eq!(escape("50% off_now"), r"50\% off\_now");
/// assert_eq!(escape(r"C:\dir"), r"C:\textbackslash{}dir");
/// ```
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    escape_into(&mut out, text);
    out
}

/// Append the escaped form of `text` to `out`.
pub fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match replacement(ch) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cases() -> u32 {
        std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_full_map() {
        assert_eq!(
            escape(r"\&%$#_{}~^<>"),
            concat!(
                r"\textbackslash{}\&\%\$\#\_\{\}",
                r"\textasciitilde{}\textasciicircum{}\textless{}\textgreater{}"
            )
        );
    }

    #[test]
    fn test_backslash_replacement_not_reescaped() {
        // The braces of \textbackslash{} must survive untouched.
        assert_eq!(escape(r"\{"), r"\textbackslash{}\{");
    }

    #[test]
    fn test_already_escaped_text_is_escaped_again() {
        assert_eq!(escape(r"\%"), r"\textbackslash{}\%");
    }

    #[test]
    fn test_unicode_passes_through() {
        assert_eq!(escape("Straße – naïve café"), "Straße – naïve café");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(cases()))]

        #[test]
        fn prop_plain_text_is_unchanged(s in "[A-Za-z0-9 .,;:!?()'\"@=+*/|-]{0,80}") {
            prop_assert_eq!(escape(&s), s);
        }

        #[test]
        fn prop_single_special_char_replaced_once(
            prefix in "[A-Za-z0-9 ]{0,30}",
            idx in 0..SPECIAL_CHARS.len(),
            suffix in "[A-Za-z0-9 ]{0,30}",
        ) {
            let ch = SPECIAL_CHARS[idx];
            let input = format!("{prefix}{ch}{suffix}");
            let expected = replacement(ch).unwrap();

            let out = escape(&input);

            prop_assert_eq!(out.matches(expected).count(), 1);
            prop_assert_eq!(out, format!("{prefix}{expected}{suffix}"));
        }
    }
}
