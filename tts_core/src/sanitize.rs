//! Input cleanup before text is embedded in an SSML document.

/// Strip control characters that the speech service rejects inside SSML.
///
/// Returns `None` when there is nothing to speak (empty or whitespace-only
/// input). Otherwise every code point in `0..=8`, `11..=12` or `14..=31` is
/// replaced by a single space; tab, line feed and carriage return are kept, and
/// the character count of the input is preserved.
pub fn sanitize(input: &str) -> Option<String> {
    if input.trim().is_empty() {
        return None;
    }

    Some(
        input
            .chars()
            .map(|c| if is_incompatible(c) { ' ' } else { c })
            .collect(),
    )
}

fn is_incompatible(c: char) -> bool {
    matches!(c as u32, 0..=8 | 11..=12 | 14..=31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_blank_input() {
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("   "), None);
        assert_eq!(sanitize("\t\n\r "), None);
    }

    #[test]
    fn test_sanitize_replaces_control_chars() {
        for code in (0u32..=8).chain(11..=12).chain(14..=31) {
            let c = char::from_u32(code).unwrap();
            let input = format!("a{c}b");
            assert_eq!(sanitize(&input).as_deref(), Some("a b"), "code {code}");
        }
    }

    #[test]
    fn test_sanitize_keeps_whitespace_controls() {
        assert_eq!(sanitize("a\tb\nc\rd").as_deref(), Some("a\tb\nc\rd"));
    }

    #[test]
    fn test_sanitize_preserves_length() {
        let input = "Hello\u{0}wörld\u{1f}, 你好\u{7f}!";
        let output = sanitize(input).unwrap();
        assert_eq!(output.chars().count(), input.chars().count());
        // DEL (127) is outside the replaced ranges
        assert!(output.contains('\u{7f}'));
        assert_eq!(output, "Hello wörld , 你好\u{7f}!");
    }
}
