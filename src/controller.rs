//! Search box behavior: debounced scanning, result painting, dismissal.

use serde_json::Value;

use crate::config::Config;
use crate::dom::{Dom, NodeId};
use crate::error::Result;
use crate::grouping::{collect_matches, group_by_path};
use crate::index::{documents_from_value, Document};
use crate::results::{render_results, RenderOptions, ACTIVE_CLASS, HREF_ATTR, ITEM_CLASS};
use crate::timer::{Scheduler, TimerId};

/// Where a click wants the browser to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub url: String,
}

/// The timer event the controller arms for itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSearch {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Debouncing { query: String },
    Rendered { query: String, results: usize },
}

pub struct SearchController {
    documents: Vec<Document>,
    input: NodeId,
    container: NodeId,
    /// The single pending debounce timer, if any.
    pending: Option<TimerId>,
    state: SearchState,
    min_query_chars: usize,
    debounce: std::time::Duration,
    context_chars: usize,
    posts_prefix: String,
}

impl SearchController {
    /// Validate the raw index and bind the controller to its elements.
    ///
    /// A malformed index is logged and returned; no controller is built.
    pub fn install(data: &Value, input: NodeId, container: NodeId, config: &Config) -> Result<Self> {
        let documents = documents_from_value(data).inspect_err(|e| {
            log::error!("Search disabled: {e}");
        })?;
        log::info!("Search ready over {} documents", documents.len());
        Ok(Self::with_documents(documents, input, container, config))
    }

    pub fn with_documents(documents: Vec<Document>, input: NodeId, container: NodeId, config: &Config) -> Self {
        SearchController {
            documents,
            input,
            container,
            pending: None,
            state: SearchState::Idle,
            min_query_chars: config.min_query_chars,
            debounce: config.debounce(),
            context_chars: config.context_chars,
            posts_prefix: config.posts_prefix.clone(),
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Handle an `input` event carrying the field's current value.
    ///
    /// Any pending search is cancelled first. Short queries stop there and
    /// leave whatever is on screen alone.
    pub fn on_input<E>(&mut self, value: &str, timers: &mut Scheduler<E>)
    where
        E: From<RunSearch>,
    {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
            if matches!(self.state, SearchState::Debouncing { .. }) {
                self.state = SearchState::Idle;
            }
        }

        let query = value.trim().to_lowercase();
        if query.chars().count() < self.min_query_chars {
            log::debug!("Query {query:?} too short, not searching");
            return;
        }

        let id = timers.schedule(self.debounce, E::from(RunSearch { query: query.clone() }));
        self.pending = Some(id);
        self.state = SearchState::Debouncing { query };
    }

    /// The debounce timer fired: scan, group and paint.
    pub fn run_search(&mut self, dom: &mut Dom, event: RunSearch) {
        self.pending = None;
        let RunSearch { query } = event;

        let grouped = group_by_path(collect_matches(&self.documents, &query));
        let opts = RenderOptions {
            context_chars: self.context_chars,
            posts_prefix: &self.posts_prefix,
        };
        let results = render_results(dom, self.container, &grouped, &query, &opts);
        log::debug!(
            "Search {query:?}: {results} matches in {} documents",
            grouped.group_count()
        );
        self.state = SearchState::Rendered { query, results };
    }

    /// Handle a document-level click.
    ///
    /// Clicks on a result item navigate to it. Clicks outside both the input
    /// and the results panel hide the panel.
    pub fn on_click(&mut self, dom: &mut Dom, target: NodeId) -> Option<Navigation> {
        let inside_container = dom.contains(self.container, target);
        if !inside_container && !dom.contains(self.input, target) {
            dom.remove_class(self.container, ACTIVE_CLASS);
            if matches!(self.state, SearchState::Rendered { .. }) {
                self.state = SearchState::Idle;
            }
            return None;
        }
        if !inside_container {
            return None;
        }

        let item = dom.closest(target, |d, n| d.has_class(n, ITEM_CLASS))?;
        let url = dom.attr(item, HREF_ATTR)?.to_string();
        log::info!("Navigating to {url}");
        Some(Navigation { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::NO_RESULTS_CLASS;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        dom: Dom,
        timers: Scheduler<RunSearch>,
        controller: SearchController,
        outside: NodeId,
    }

    fn fixture() -> Fixture {
        let mut dom = Dom::new();
        let body = dom.body();
        let input = dom.create_element("input");
        let container = dom.create_element("div");
        let outside = dom.create_element("p");
        dom.append_child(body, input).unwrap();
        dom.append_child(body, container).unwrap();
        dom.append_child(body, outside).unwrap();

        let data = json!([
            {"path": "a", "content": "the cat sat"},
            {"path": "b", "content": "cats and cats"}
        ]);
        let controller = SearchController::install(&data, input, container, &Config::default()).unwrap();
        Fixture {
            dom,
            timers: Scheduler::new(),
            controller,
            outside,
        }
    }

    fn advance(f: &mut Fixture, ms: u64) {
        let until = f.timers.now() + Duration::from_millis(ms);
        while let Some((_, event)) = f.timers.pop_due(until) {
            f.controller.run_search(&mut f.dom, event);
        }
        f.timers.settle(until);
    }

    fn item_count(f: &Fixture) -> usize {
        f.dom.all_by_class(f.controller.container(), ITEM_CLASS).len()
    }

    #[test]
    fn test_install_rejects_non_array() {
        let mut dom = Dom::new();
        let input = dom.create_element("input");
        let container = dom.create_element("div");
        let result = SearchController::install(&json!({"a": 1}), input, container, &Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_debounced_search_renders_once() {
        let mut f = fixture();
        f.controller.on_input("ca", &mut f.timers);
        advance(&mut f, 100);
        f.controller.on_input("cat", &mut f.timers);
        assert_eq!(f.timers.pending_count(), 1);

        advance(&mut f, 199);
        assert_eq!(item_count(&f), 0);
        assert!(matches!(f.controller.state(), SearchState::Debouncing { .. }));

        advance(&mut f, 1);
        assert_eq!(item_count(&f), 3);
        assert_eq!(
            f.controller.state(),
            &SearchState::Rendered { query: "cat".to_string(), results: 3 }
        );
    }

    #[test]
    fn test_query_is_trimmed_and_lowercased() {
        let mut f = fixture();
        f.controller.on_input("  CATS ", &mut f.timers);
        advance(&mut f, 200);
        assert_eq!(
            f.controller.state(),
            &SearchState::Rendered { query: "cats".to_string(), results: 2 }
        );
    }

    #[test]
    fn test_short_query_leaves_results_untouched() {
        let mut f = fixture();
        f.controller.on_input("cat", &mut f.timers);
        advance(&mut f, 200);
        let before = f.dom.inner_html(f.controller.container());

        f.controller.on_input("c", &mut f.timers);
        assert_eq!(f.timers.pending_count(), 0);
        advance(&mut f, 1000);
        assert_eq!(f.dom.inner_html(f.controller.container()), before);
        assert!(matches!(f.controller.state(), SearchState::Rendered { .. }));
    }

    #[test]
    fn test_short_query_cancels_pending_search() {
        let mut f = fixture();
        f.controller.on_input("cat", &mut f.timers);
        f.controller.on_input("c", &mut f.timers);
        advance(&mut f, 1000);
        assert_eq!(item_count(&f), 0);
        assert_eq!(f.controller.state(), &SearchState::Idle);
    }

    #[test]
    fn test_repeated_searches_reuse_result_nodes() {
        let mut f = fixture();
        f.controller.on_input("cat", &mut f.timers);
        advance(&mut f, 200);
        let nodes = f.dom.node_count();

        for query in ["cats", "dog", "cat"] {
            f.controller.on_input(query, &mut f.timers);
            advance(&mut f, 200);
        }
        assert_eq!(item_count(&f), 3);
        assert_eq!(f.dom.node_count(), nodes);
    }

    #[test]
    fn test_no_results_placeholder() {
        let mut f = fixture();
        f.controller.on_input("dog", &mut f.timers);
        advance(&mut f, 200);
        assert!(f.dom.first_by_class(f.controller.container(), NO_RESULTS_CLASS).is_some());
    }

    #[test]
    fn test_click_outside_hides_and_item_click_navigates() {
        let mut f = fixture();
        f.controller.on_input("cat", &mut f.timers);
        advance(&mut f, 200);
        let container = f.controller.container();

        let items = f.dom.all_by_class(container, ITEM_CLASS);
        let title_text = f.dom.text_nodes(items[2]).next().map(|(n, _)| n).unwrap();
        let nav = f.controller.on_click(&mut f.dom, title_text);
        assert_eq!(
            nav,
            Some(Navigation { url: "/posts/b.html?highlight=cat&matchNum=2".to_string() })
        );

        let input = f.controller.input();
        assert_eq!(f.controller.on_click(&mut f.dom, input), None);
        assert!(f.dom.has_class(container, ACTIVE_CLASS));

        assert_eq!(f.controller.on_click(&mut f.dom, f.outside), None);
        assert!(!f.dom.has_class(container, ACTIVE_CLASS));
        assert_eq!(f.controller.state(), &SearchState::Idle);
    }
}
