//! String helpers for logging device tokens.
//!
//! Registration tokens are long and sensitive; logs only ever carry a short
//! prefix.

/// Number of token bytes kept in log output.
pub const TOKEN_LOG_PREFIX: usize = 8;

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Log-safe prefix of a device token.
#[inline]
pub fn token_prefix(token: &str) -> &str {
    truncate_str(token, TOKEN_LOG_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_untouched() {
        assert_eq!(truncate_str("abc", 8), "abc");
        assert_eq!(truncate_str("", 8), "");
    }

    #[test]
    fn truncates_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn snaps_to_char_boundary() {
        // 'é' is two bytes starting at index 1
        assert_eq!(truncate_str("aébc", 2), "a");
        assert_eq!(truncate_str("aébc", 3), "aé");
    }

    #[test]
    fn token_prefix_is_eight_bytes() {
        assert_eq!(token_prefix("fGx3k9Lm:APA91bH"), "fGx3k9Lm");
    }
}
