/// Truncate a string to at most `max_chars` characters, on a char boundary.
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `s` cut to `max_chars` characters with `...` appended when it was longer.
pub fn clip(s: &str, max_chars: usize) -> String {
    let cut = truncate_str(s, max_chars);
    if cut.len() < s.len() {
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Like [`clip`], but the result including the ellipsis fits in `limit`
/// characters.
pub fn clip_within(s: &str, limit: usize) -> String {
    if s.chars().count() > limit {
        clip(s, limit.saturating_sub(3))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_str("ñandú", 3), "ñan");
        assert_eq!(truncate_str("abc", 10), "abc");
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("abcdef", 3), "abc...");
        assert_eq!(clip("abc", 3), "abc");
        assert_eq!(clip_within("abcdefghij", 8), "abcde...");
        assert_eq!(clip_within("abcdefgh", 8), "abcdefgh");
    }
}
