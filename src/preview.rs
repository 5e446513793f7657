//! Bounded-context previews with every query occurrence emphasized.

use regex::{Regex, RegexBuilder};

use crate::dom::escape_html;

pub const ELLIPSIS: &str = "...";
pub const HIGHLIGHT_CLASS: &str = "highlight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Highlight(&'a str),
}

/// A preview window cut from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview<'a> {
    pub leading_ellipsis: bool,
    pub segments: Vec<Segment<'a>>,
    pub trailing_ellipsis: bool,
}

impl<'a> Preview<'a> {
    /// Cut up to `context` characters either side of `[match_start, match_end)`
    /// and split the window around every occurrence of `query`.
    pub fn build(content: &'a str, match_start: usize, match_end: usize, query: &str, context: usize) -> Self {
        let match_end = floor_boundary(content, match_end.min(content.len()));
        let match_start = floor_boundary(content, match_start.min(match_end));

        let start = back_chars(content, match_start, context);
        let end = forward_chars(content, match_end, context);
        let window = &content[start..end];

        Preview {
            leading_ellipsis: start > 0,
            segments: split_highlights(window, query),
            trailing_ellipsis: end < content.len(),
        }
    }

    pub fn highlight_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Highlight(_)))
            .count()
    }

    /// Visible text without markup or ellipses.
    pub fn window_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Plain(t) | Segment::Highlight(t) => *t,
            })
            .collect()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        if self.leading_ellipsis {
            html.push_str(ELLIPSIS);
        }
        for segment in &self.segments {
            match segment {
                Segment::Plain(text) => html.push_str(&escape_html(text)),
                Segment::Highlight(text) => {
                    html.push_str(&format!(
                        "<span class=\"{HIGHLIGHT_CLASS}\">{}</span>",
                        escape_html(text)
                    ));
                }
            }
        }
        if self.trailing_ellipsis {
            html.push_str(ELLIPSIS);
        }
        html
    }
}

/// Render the preview for one match as an HTML fragment.
pub fn generate_preview(content: &str, match_start: usize, match_end: usize, query: &str, context: usize) -> String {
    Preview::build(content, match_start, match_end, query, context).to_html()
}

/// Case-insensitive literal matcher for `query`.
pub fn literal_matcher(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Cannot build highlight pattern for {query:?}: {e}");
            None
        }
    }
}

fn split_highlights<'a>(window: &'a str, query: &str) -> Vec<Segment<'a>> {
    let Some(re) = literal_matcher(query) else {
        return vec![Segment::Plain(window)];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in re.find_iter(window) {
        if m.start() > last {
            segments.push(Segment::Plain(&window[last..m.start()]));
        }
        segments.push(Segment::Highlight(m.as_str()));
        last = m.end();
    }
    if last < window.len() || segments.is_empty() {
        segments.push(Segment::Plain(&window[last..]));
    }
    segments
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn back_chars(s: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    s[..from]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn forward_chars(s: &str, from: usize, n: usize) -> usize {
    s[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(s.len())
}
