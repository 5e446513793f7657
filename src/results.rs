//! Turns grouped matches into the clickable result list.

use crate::dom::{Dom, NodeId};
use crate::grouping::GroupedMatches;
use crate::location::{encode_component, encode_path};
use crate::preview::{Preview, Segment, ELLIPSIS, HIGHLIGHT_CLASS};

pub const ACTIVE_CLASS: &str = "active";
pub const ITEM_CLASS: &str = "search-result-item";
pub const TITLE_CLASS: &str = "search-result-title";
pub const CONTEXT_CLASS: &str = "search-result-context";
pub const NO_RESULTS_CLASS: &str = "search-no-results";
pub const NO_RESULTS_TEXT: &str = "No results found";
pub const HREF_ATTR: &str = "data-href";

#[derive(Debug, Clone)]
pub struct RenderOptions<'c> {
    pub context_chars: usize,
    pub posts_prefix: &'c str,
}

/// One rendered row, before it becomes DOM.
#[derive(Debug, Clone)]
pub struct ResultEntry<'a> {
    pub path: &'a str,
    pub title: String,
    pub url: String,
    /// 1-based position of the match within its path group.
    pub ordinal: usize,
    pub total: usize,
    pub preview: Preview<'a>,
}

/// Last path segment, or the whole path when that segment is empty.
pub fn basename(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

pub fn result_title(path: &str, ordinal: usize, total: usize) -> String {
    if total > 1 {
        format!("{} ({ordinal}/{total})", basename(path))
    } else {
        basename(path).to_string()
    }
}

/// URL of the post with the highlight request attached.
pub fn result_url(posts_prefix: &str, path: &str, query: &str, ordinal: usize) -> String {
    format!(
        "{posts_prefix}{}.html?highlight={}&matchNum={ordinal}",
        encode_path(path),
        encode_component(query)
    )
}

pub fn result_entries<'a>(grouped: &GroupedMatches<'a>, query: &str, opts: &RenderOptions<'_>) -> Vec<ResultEntry<'a>> {
    let mut entries = Vec::with_capacity(grouped.total_matches());
    for group in grouped.groups() {
        let total = group.matches.len();
        for (i, m) in group.matches.iter().enumerate() {
            let ordinal = i + 1;
            entries.push(ResultEntry {
                path: group.path,
                title: result_title(group.path, ordinal, total),
                url: result_url(opts.posts_prefix, group.path, query, ordinal),
                ordinal,
                total,
                preview: Preview::build(m.content, m.start, m.end, query, opts.context_chars),
            });
        }
    }
    entries
}

/// Repaint `container` with one item per match and mark it visible.
///
/// Returns the number of result items painted.
pub fn render_results(
    dom: &mut Dom,
    container: NodeId,
    grouped: &GroupedMatches<'_>,
    query: &str,
    opts: &RenderOptions<'_>,
) -> usize {
    dom.clear_children(container);

    if grouped.is_empty() {
        let empty = append_element(dom, container, "div", NO_RESULTS_CLASS);
        let text = dom.create_text(NO_RESULTS_TEXT);
        append(dom, empty, text);
        dom.add_class(container, ACTIVE_CLASS);
        return 0;
    }

    let entries = result_entries(grouped, query, opts);
    for entry in &entries {
        let item = append_element(dom, container, "div", ITEM_CLASS);
        dom.set_attr(item, HREF_ATTR, &entry.url);

        let title = append_element(dom, item, "div", TITLE_CLASS);
        let title_text = dom.create_text(entry.title.as_str());
        append(dom, title, title_text);

        let context = append_element(dom, item, "div", CONTEXT_CLASS);
        render_preview(dom, context, &entry.preview);
    }

    dom.add_class(container, ACTIVE_CLASS);
    log::debug!("Rendered {} results for {query:?}", entries.len());
    entries.len()
}

fn render_preview(dom: &mut Dom, parent: NodeId, preview: &Preview<'_>) {
    if preview.leading_ellipsis {
        let text = dom.create_text(ELLIPSIS);
        append(dom, parent, text);
    }
    for segment in &preview.segments {
        match *segment {
            Segment::Plain(s) => {
                let text = dom.create_text(s);
                append(dom, parent, text);
            }
            Segment::Highlight(s) => {
                let span = append_element(dom, parent, "span", HIGHLIGHT_CLASS);
                let text = dom.create_text(s);
                append(dom, span, text);
            }
        }
    }
    if preview.trailing_ellipsis {
        let text = dom.create_text(ELLIPSIS);
        append(dom, parent, text);
    }
}

fn append_element(dom: &mut Dom, parent: NodeId, tag: &str, class: &str) -> NodeId {
    let el = dom.create_element(tag);
    dom.add_class(el, class);
    append(dom, parent, el);
    el
}

fn append(dom: &mut Dom, parent: NodeId, child: NodeId) {
    // Fresh nodes under an element cannot violate the hierarchy.
    if let Err(e) = dom.append_child(parent, child) {
        log::error!("Failed to append result node: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{collect_matches, group_by_path};
    use crate::index::Document;

    const OPTS: RenderOptions<'static> = RenderOptions {
        context_chars: 50,
        posts_prefix: "/posts/",
    };

    fn container(dom: &mut Dom) -> NodeId {
        let c = dom.create_element("div");
        dom.add_class(c, "search-results");
        let body = dom.body();
        dom.append_child(body, c).unwrap();
        c
    }

    #[test]
    fn test_basename_and_title() {
        assert_eq!(basename("notes/rust/ownership"), "ownership");
        assert_eq!(basename("about"), "about");
        assert_eq!(basename("notes/"), "notes/");
        assert_eq!(result_title("notes/rust", 2, 3), "rust (2/3)");
        assert_eq!(result_title("notes/rust", 1, 1), "rust");
    }

    #[test]
    fn test_result_url_encoding() {
        assert_eq!(
            result_url("/posts/", "notes/hello world", "f(x) & y", 2),
            "/posts/notes/hello%20world.html?highlight=f%28x%29%20%26%20y&matchNum=2"
        );
    }

    #[test]
    fn test_render_results_cats_scenario() {
        let documents = vec![Document::new("a", "the cat sat"), Document::new("b", "cats and cats")];
        let grouped = group_by_path(collect_matches(&documents, "cat"));

        let mut dom = Dom::new();
        let c = container(&mut dom);
        let rendered = render_results(&mut dom, c, &grouped, "cat", &OPTS);
        assert_eq!(rendered, 3);

        let items = dom.all_by_class(c, ITEM_CLASS);
        assert_eq!(items.len(), 3);
        let titles: Vec<String> = items
            .iter()
            .map(|&i| dom.text_content(dom.first_by_class(i, TITLE_CLASS).unwrap()))
            .collect();
        assert_eq!(titles, vec!["a", "b (1/2)", "b (2/2)"]);

        assert_eq!(dom.attr(items[0], HREF_ATTR), Some("/posts/a.html?highlight=cat&matchNum=1"));
        assert_eq!(dom.attr(items[2], HREF_ATTR), Some("/posts/b.html?highlight=cat&matchNum=2"));
        assert!(dom.has_class(c, ACTIVE_CLASS));

        let context = dom.first_by_class(items[0], CONTEXT_CLASS).unwrap();
        assert_eq!(
            dom.inner_html(context),
            "the <span class=\"highlight\">cat</span> sat"
        );
    }

    #[test]
    fn test_render_results_empty_replaces_previous() {
        let documents = vec![Document::new("a", "the cat sat")];
        let mut dom = Dom::new();
        let c = container(&mut dom);

        let grouped = group_by_path(collect_matches(&documents, "cat"));
        render_results(&mut dom, c, &grouped, "cat", &OPTS);
        assert_eq!(dom.all_by_class(c, ITEM_CLASS).len(), 1);

        let grouped = group_by_path(collect_matches(&documents, "dog"));
        let rendered = render_results(&mut dom, c, &grouped, "dog", &OPTS);
        assert_eq!(rendered, 0);
        assert!(dom.all_by_class(c, ITEM_CLASS).is_empty());
        let empty = dom.first_by_class(c, NO_RESULTS_CLASS).unwrap();
        assert_eq!(dom.text_content(empty), NO_RESULTS_TEXT);
        assert!(dom.has_class(c, ACTIVE_CLASS));
    }
}
