//! Literal, case-insensitive substring matching.
//!
//! Offsets are byte offsets into the original text and always sit on char
//! boundaries, even when lowercasing changes a character's encoded length.

use serde::Serialize;

/// Half-open byte range of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Case-fold one character the same way for content and query.
///
/// Final sigma folds to `σ` so word position never affects a match.
fn fold_char(ch: char, out: &mut String) {
    for lower in ch.to_lowercase() {
        out.push(if lower == 'ς' { 'σ' } else { lower });
    }
}

/// Per-character case fold used for matching.
pub fn fold_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        fold_char(ch, &mut out);
    }
    out
}

/// Lowercased copy of a text plus the map back to the original offsets.
struct Folded {
    text: String,
    /// `boundaries[i]` is the original offset when folded byte `i` starts an
    /// original character (or is the end of the text).
    boundaries: Vec<Option<usize>>,
}

impl Folded {
    fn new(content: &str) -> Self {
        let mut text = String::with_capacity(content.len());
        let mut boundaries = Vec::with_capacity(content.len() + 1);

        for (offset, ch) in content.char_indices() {
            fold_char(ch, &mut text);
            boundaries.push(Some(offset));
            boundaries.resize(text.len(), None);
        }
        boundaries.push(Some(content.len()));

        Folded { text, boundaries }
    }
}

/// Find every non-overlapping occurrence of `query` in `content`, ignoring case.
///
/// Scanning resumes at the end of each hit, so "aa" in "aaa" yields one span.
/// An empty query yields nothing.
pub fn find_all_matches(content: &str, query: &str) -> Vec<Span> {
    let needle = fold_case(query);
    if needle.is_empty() || content.is_empty() {
        return Vec::new();
    }

    let folded = Folded::new(content);
    let mut matches = Vec::new();
    let mut pos = 0;

    while let Some(rel) = folded.text[pos..].find(&needle) {
        let start = pos + rel;
        let end = start + needle.len();

        match (folded.boundaries[start], folded.boundaries[end]) {
            (Some(orig_start), Some(orig_end)) => {
                matches.push(Span {
                    start: orig_start,
                    end: orig_end,
                });
                pos = end;
            }
            _ => {
                // Hit straddles a multi-char lowercase expansion; step past it.
                let step = folded.text[start..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                pos = start + step;
            }
        }
    }

    matches
}

/// Count occurrences without keeping the spans.
pub fn count_matches(content: &str, query: &str) -> usize {
    find_all_matches(content, query).len()
}
