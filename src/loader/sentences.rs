use std::sync::LazyLock;

use regex::Regex;

static BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Fragments this short or shorter are noise (list markers, page numbers, "Sec. 2.").
pub const MIN_SENTENCE_CHARS: usize = 10;

/// Split text after `.`, `!` or `?` followed by whitespace.
/// Fragments of `MIN_SENTENCE_CHARS` or fewer characters are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;

    for m in BOUNDARY_RE.find_iter(text) {
        // punctuation stays with the sentence it ends
        push_fragment(&mut out, &text[start..m.start() + 1]);
        start = m.end();
    }
    push_fragment(&mut out, &text[start..]);
    out
}

fn push_fragment(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if trimmed.chars().count() > MIN_SENTENCE_CHARS {
        out.push(trimmed.to_string());
    }
}

/// Cut `text` to at most `max_chars` characters. Returns `None` when it already fits.
pub fn truncate_chars(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices().nth(max_chars).map(|(byte, _)| &text[..byte])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("The bill passed the House. Did it pass the Senate? It did not!  Next steps follow.");
        assert_eq!(
            s,
            vec![
                "The bill passed the House.",
                "Did it pass the Senate?",
                "It did not!",
                "Next steps follow."
            ]
        );
    }

    #[test]
    fn short_fragments_dropped() {
        // "Too short." is exactly 10 chars
        let s = split_sentences("Sec. 2. Ok. Too short. Just long enough. This sentence is long enough.");
        assert_eq!(s, vec!["Just long enough.", "This sentence is long enough."]);
    }

    #[test]
    fn punctuation_without_whitespace_does_not_split() {
        let s = split_sentences("Funding of $1.5 billion is authorized for fiscal year 2026.");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn repeated_punctuation_stays_together() {
        let s = split_sentences("This is surprising!! Nobody expected the vote.");
        assert_eq!(s[0], "This is surprising!!");
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 10 chars but more than 10 bytes
        assert!(split_sentences("é€é€é€é€é.").is_empty());
        assert_eq!(split_sentences("é€é€é€é€é€.").len(), 1);
    }

    #[test]
    fn empty_text() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t ").is_empty());
    }

    #[test]
    fn truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), Some("hé"));
        assert_eq!(truncate_chars("héllo", 5), None);
        assert_eq!(truncate_chars("héllo", 9), None);
    }
}
