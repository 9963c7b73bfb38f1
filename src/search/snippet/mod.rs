
use crate::records::prefix_chars;

/// Words scanned per position when looking for query terms
pub const SCAN_WINDOW_WORDS: usize = 50;
/// Words kept in the snippet
pub const SNIPPET_WORDS: usize = 60;
/// Words of context kept before the best position
pub const LEAD_IN_WORDS: usize = 10;
/// Maximum snippet length in characters, before ellipses
pub const SNIPPET_MAX_CHARS: usize = 300;

/// Cut the part of `content` most relevant to `query`
///
/// Each word position is scored by how many lowercase query terms occur
/// (as substrings) in the following [`SCAN_WINDOW_WORDS`] words; the first
/// position with the highest count wins. The snippet starts
/// [`LEAD_IN_WORDS`] before it, holds [`SNIPPET_WORDS`] words and is cut to
/// [`SNIPPET_MAX_CHARS`] characters. Ellipses mark a cut end and a snippet
/// that does not start at the beginning of the content.
#[inline]
pub fn extract_snippet(content: &str, query: &str) -> String {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    let words: Vec<&str> = content.split_whitespace().collect();

    let mut best_index = 0;
    let mut best_matches = 0;
    for index in 0..words.len() {
        let end = (index + SCAN_WINDOW_WORDS).min(words.len());
        let window = words
            .get(index..end)
            .unwrap_or_default()
            .join(" ")
            .to_lowercase();
        let matches = terms.iter().filter(|term| window.contains(term.as_str())).count();
        if matches > best_matches {
            best_matches = matches;
            best_index = index;
        }
    }

    let start = best_index.saturating_sub(LEAD_IN_WORDS);
    let end = (start + SNIPPET_WORDS).min(words.len());
    let text = words.get(start..end).unwrap_or_default().join(" ");

    let mut snippet = String::with_capacity(SNIPPET_MAX_CHARS + 6);
    if start > 0 {
        snippet.push_str("...");
    }
    let kept = prefix_chars(&text, SNIPPET_MAX_CHARS);
    snippet.push_str(kept);
    if kept.len() < text.len() {
        snippet.push_str("...");
    }
    snippet
}
