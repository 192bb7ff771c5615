/// Truncates `content` to `max_length` characters, marking the cut with `...`.
pub(crate) fn shorten_content(content: &str, max_length: usize) -> String {
    if content.chars().count() <= max_length {
        content.to_owned()
    } else {
        content.chars().take(max_length).collect::<String>() + "..."
    }
}

/// First `len` characters of a commit hash.
pub(crate) fn short_id(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten() {
        assert_eq!(shorten_content("short", 200), "short");
        assert_eq!(shorten_content(&"a".repeat(200), 200), "a".repeat(200));
        assert_eq!(
            shorten_content(&"é".repeat(201), 200),
            "é".repeat(200) + "..."
        );
    }

    #[test]
    fn short_ids() {
        assert_eq!(short_id("1234567890abcdef", 8), "12345678");
        assert_eq!(short_id("abc", 8), "abc");
        assert_eq!(short_id("unknown", 8), "unknown");
    }
}
