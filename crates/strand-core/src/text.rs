//! UTF-8–safe text chunking and truncation.
//!
//! Rust `&str[..n]` panics when `n` falls inside a multi-byte character.
//! These helpers always cut at char boundaries, so chunking is safe and
//! concatenating the chunks reconstructs the original exactly.

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    // `floor_char_boundary` is nightly-only, so walk back ourselves.
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate `s` and append a suffix (e.g. `"..."`) if it exceeds `max_bytes`.
///
/// The returned string is at most `max_bytes` bytes (including the suffix).
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let body_budget = max_bytes.saturating_sub(suffix.len());
    let prefix = truncate_str(s, body_budget);
    format!("{prefix}{suffix}")
}

/// Split `s` into chunks of at most `chunk_bytes` bytes for progressive
/// display, cutting only at char boundaries.
///
/// Invariant: `chunks.concat() == s`. A `chunk_bytes` of 0 is treated as 1
/// so every non-empty input yields at least one chunk.
pub fn chunk_text(s: &str, chunk_bytes: usize) -> Vec<&str> {
    let chunk_bytes = chunk_bytes.max(1);
    let mut chunks = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let head = truncate_str(rest, chunk_bytes);
        // A multi-byte char wider than the budget still advances by one char.
        let taken = if head.is_empty() {
            let mut end = 1;
            while !rest.is_char_boundary(end) {
                end += 1;
            }
            &rest[..end]
        } else {
            head
        };
        chunks.push(taken);
        rest = &rest[taken.len()..];
    }
    chunks
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── truncate_str ─────────────────────────────────────────────────────

    #[test]
    fn truncate_within_limit() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn truncate_ascii() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn truncate_snaps_to_char_boundary() {
        // '€' is 3 bytes.
        assert_eq!(truncate_str("ab€cd", 3), "ab");
        assert_eq!(truncate_str("ab€cd", 5), "ab€");
    }

    #[test]
    fn truncate_with_suffix_fits() {
        assert_eq!(truncate_with_suffix("hello", 10, "..."), "hello");
    }

    #[test]
    fn truncate_with_suffix_applied() {
        assert_eq!(truncate_with_suffix("hello world", 8, "..."), "hello...");
    }

    // ── chunk_text ───────────────────────────────────────────────────────

    #[test]
    fn chunks_concat_to_original_ascii() {
        let s = "the quick brown fox jumps over the lazy dog";
        let chunks = chunk_text(s, 7);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), s);
    }

    #[test]
    fn chunks_concat_to_original_multibyte() {
        let s = "prix: 42€ — résumé complet";
        for size in 1..=8 {
            let chunks = chunk_text(s, size);
            assert_eq!(chunks.concat(), s, "chunk size {size}");
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 8).is_empty());
    }

    #[test]
    fn single_chunk_when_input_fits() {
        assert_eq!(chunk_text("Hello", 64), vec!["Hello"]);
    }

    #[test]
    fn zero_budget_still_terminates() {
        let chunks = chunk_text("a€b", 0);
        assert_eq!(chunks.concat(), "a€b");
    }
}
