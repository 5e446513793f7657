use ahash::AHashMap;
use serde::Serialize;

use crate::index::Document;
use crate::matcher::{find_all_matches, Span};

/// One occurrence of the query, borrowed from the document it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Match<'a> {
    pub path: &'a str,
    #[serde(skip)]
    pub content: &'a str,
    pub start: usize,
    pub end: usize,
}

impl<'a> Match<'a> {
    pub fn new(doc: &'a Document, span: Span) -> Self {
        Match {
            path: &doc.path,
            content: &doc.content,
            start: span.start,
            end: span.end,
        }
    }

    pub fn text(&self) -> &'a str {
        &self.content[self.start..self.end]
    }
}

/// Matches grouped by document path, in first-seen order.
#[derive(Debug, Default, Serialize)]
pub struct GroupedMatches<'a> {
    groups: Vec<MatchGroup<'a>>,
    #[serde(skip)]
    index: AHashMap<&'a str, usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchGroup<'a> {
    pub path: &'a str,
    pub matches: Vec<Match<'a>>,
}

impl<'a> GroupedMatches<'a> {
    pub fn push(&mut self, m: Match<'a>) {
        match self.index.get(m.path) {
            Some(&slot) => self.groups[slot].matches.push(m),
            None => {
                self.index.insert(m.path, self.groups.len());
                self.groups.push(MatchGroup {
                    path: m.path,
                    matches: vec![m],
                });
            }
        }
    }

    pub fn groups(&self) -> &[MatchGroup<'a>] {
        &self.groups
    }

    pub fn get(&self, path: &str) -> Option<&[Match<'a>]> {
        self.index
            .get(path)
            .map(|&slot| self.groups[slot].matches.as_slice())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn total_matches(&self) -> usize {
        self.groups.iter().map(|g| g.matches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group a flat, scan-ordered match list by path.
pub fn group_by_path<'a, I>(matches: I) -> GroupedMatches<'a>
where
    I: IntoIterator<Item = Match<'a>>,
{
    let mut grouped = GroupedMatches::default();
    for m in matches {
        grouped.push(m);
    }
    grouped
}

/// Scan every document for `query` and flatten the hits in document order.
pub fn collect_matches<'a>(documents: &'a [Document], query: &str) -> Vec<Match<'a>> {
    documents
        .iter()
        .flat_map(|doc| {
            find_all_matches(&doc.content, query)
                .into_iter()
                .map(move |span| Match::new(doc, span))
        })
        .collect()
}
