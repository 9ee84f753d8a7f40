//! Free-text sanitization for notes, event props and site content.

/// Strip ASCII control characters, trim surrounding whitespace and cap the
/// result at `max_len` characters.
///
/// Used everywhere untrusted text is persisted: order notes, tracking
/// props, site content fields and payment-failure notes.
#[must_use]
pub fn sanitize_text(value: &str, max_len: usize) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_control_chars() {
        assert_eq!(sanitize_text("a\u{0}b\u{1f}c\u{7f}d", 40), "abcd");
        assert_eq!(sanitize_text("line\nbreak", 40), "linebreak");
    }

    #[test]
    fn test_trims_and_caps() {
        assert_eq!(sanitize_text("  hello  ", 40), "hello");
        assert_eq!(sanitize_text("abcdef", 3), "abc");
    }

    #[test]
    fn test_caps_by_chars_not_bytes() {
        assert_eq!(sanitize_text("ééééé", 3), "ééé");
    }

    #[test]
    fn test_empty() {
        assert_eq!(sanitize_text("", 10), "");
        assert_eq!(sanitize_text("   ", 10), "");
    }
}
