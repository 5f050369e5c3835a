//! Keeps API keys and large payloads out of debug/error logs.

/// Maximum number of bytes of a payload that end up in a log line.
const TRUNCATE_LIMIT: usize = 256;

/// Visible prefix length of a masked secret.
const SECRET_VISIBLE_CHARS: usize = 4;

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncates a response body for logging, noting the original size.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Masks a secret, keeping only a short prefix (`"sk_l****"`).
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    let visible: String = secret.chars().take(SECRET_VISIBLE_CHARS).collect();
    if visible.len() == secret.len() {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
