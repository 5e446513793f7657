//! One loaded post page: the document, its URL, the viewport, the event
//! loop, and the search, highlight and link behaviors installed on it.

use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::controller::{Navigation, RunSearch, SearchController};
use crate::dom::{Dom, DomError, NodeId};
use crate::highlight::{CrossPageHighlighter, HighlightEvent};
use crate::links::{LinkClick, LinkEvent, LinkNavigator};
use crate::location::Location;
use crate::timer::Scheduler;
use crate::viewport::Viewport;

pub const SEARCH_BOX_CLASS: &str = "nav-search";
pub const RESULTS_CLASS: &str = "search-results";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Search(RunSearch),
    Highlight(HighlightEvent),
    Link(LinkEvent),
}

impl From<RunSearch> for PageEvent {
    fn from(e: RunSearch) -> Self {
        PageEvent::Search(e)
    }
}

impl From<HighlightEvent> for PageEvent {
    fn from(e: HighlightEvent) -> Self {
        PageEvent::Highlight(e)
    }
}

impl From<LinkEvent> for PageEvent {
    fn from(e: LinkEvent) -> Self {
        PageEvent::Link(e)
    }
}

pub struct Page<V: Viewport> {
    pub dom: Dom,
    pub location: Location,
    pub viewport: V,
    timers: Scheduler<PageEvent>,
    config: Config,
    search: Option<SearchController>,
    highlighter: CrossPageHighlighter,
    links: LinkNavigator,
}

impl<V: Viewport> Page<V> {
    /// Take over a parsed document, as on `DOMContentLoaded`.
    pub fn load(dom: Dom, url: &str, viewport: V, config: Config) -> Self {
        let mut page = Page {
            dom,
            location: Location::parse(url),
            viewport,
            timers: Scheduler::new(),
            highlighter: CrossPageHighlighter::new(&config),
            links: LinkNavigator::new(&config),
            search: None,
            config,
        };
        page.highlighter.on_load(&page.location, &mut page.timers);
        page
    }

    /// Wire the search box to the loaded index.
    ///
    /// Reuses an `input` inside `.nav-search` when the page has one. On a
    /// malformed index the page keeps working without search.
    pub fn install_search(&mut self, data: &Value) -> bool {
        let input = match self.search_input() {
            Ok(input) => input,
            Err(e) => {
                log::error!("Cannot create search input: {e}");
                return false;
            }
        };
        let container = self.dom.create_element("div");
        self.dom.add_class(container, RESULTS_CLASS);
        let body = self.dom.body();
        if let Err(e) = self.dom.append_child(body, container) {
            log::error!("Cannot attach search results: {e}");
            return false;
        }

        match SearchController::install(data, input, container, &self.config) {
            Ok(controller) => {
                self.search = Some(controller);
                true
            }
            Err(_) => false,
        }
    }

    fn search_input(&mut self) -> Result<NodeId, DomError> {
        let existing = self
            .dom
            .first_by_class(self.dom.root(), SEARCH_BOX_CLASS)
            .and_then(|boxed| self.dom.first_by_tag(boxed, "input"));
        if let Some(input) = existing {
            return Ok(input);
        }

        let wrapper = self.dom.create_element("div");
        self.dom.add_class(wrapper, SEARCH_BOX_CLASS);
        let input = self.dom.create_element("input");
        self.dom.set_attr(input, "type", "text");
        self.dom.set_attr(input, "placeholder", "Search...");
        let body = self.dom.body();
        self.dom.append_child(wrapper, input)?;
        self.dom.append_child(body, wrapper)?;
        Ok(input)
    }

    pub fn search(&self) -> Option<&SearchController> {
        self.search.as_ref()
    }

    pub fn highlighter(&self) -> &CrossPageHighlighter {
        &self.highlighter
    }

    pub fn results_container(&self) -> Option<NodeId> {
        self.search.as_ref().map(SearchController::container)
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the search box's value and fire `input`.
    pub fn type_query(&mut self, value: &str) {
        let Some(search) = self.search.as_mut() else {
            log::debug!("Search not installed, ignoring input");
            return;
        };
        self.dom.set_attr(search.input(), "value", value);
        search.on_input(value, &mut self.timers);
    }

    /// Dispatch a click on `target` to every document-level listener.
    pub fn click(&mut self, target: NodeId) -> Option<Navigation> {
        let mut navigation = None;
        if let Some(search) = self.search.as_mut() {
            navigation = search.on_click(&mut self.dom, target);
        }

        let link = self.links.on_click(
            &mut self.dom,
            target,
            &self.location,
            &mut self.viewport,
            &mut self.timers,
        );
        if let LinkClick::Navigate(to) = link {
            navigation = navigation.or(Some(to));
        }
        navigation
    }

    /// Run every timer due within `by`, one at a time to completion.
    pub fn advance(&mut self, by: Duration) {
        let until = self.timers.now() + by;
        while let Some((_, event)) = self.timers.pop_due(until) {
            self.dispatch(event);
        }
        self.timers.settle(until);
    }

    /// Run timers until none are left.
    pub fn run_until_idle(&mut self) {
        while let Some(deadline) = self.timers.next_deadline() {
            if let Some((_, event)) = self.timers.pop_due(deadline) {
                self.dispatch(event);
            }
        }
    }

    fn dispatch(&mut self, event: PageEvent) {
        match event {
            PageEvent::Search(e) => {
                if let Some(search) = self.search.as_mut() {
                    search.run_search(&mut self.dom, e);
                }
            }
            PageEvent::Highlight(e) => self.highlighter.on_event(
                e,
                &mut self.dom,
                &mut self.viewport,
                &mut self.location,
                &mut self.timers,
            ),
            PageEvent::Link(e) => self.links.on_event(e, &mut self.dom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SearchState;
    use crate::highlight::{HighlightOutcome, MARK_CLASS};
    use crate::results::ITEM_CLASS;
    use crate::viewport::RecordingViewport;
    use serde_json::json;

    const POST: &str = "<html><body><div class=\"nav-search\"><input type=\"text\"></div><div class=\"content-wrapper\"><p>Cats and cats.</p><p>More cats here.</p></div></body></html>";

    fn index() -> Value {
        json!([
            {"path": "notes/cats", "content": "Cats and cats. More cats here."},
            {"path": "notes/dogs", "content": "Dogs chase cats."}
        ])
    }

    #[test]
    fn test_search_to_highlight_round_trip() {
        let mut page = Page::load(
            Dom::parse(POST),
            "https://blog.example/posts/notes/dogs.html",
            RecordingViewport::new(),
            Config::default(),
        );
        assert!(page.install_search(&index()));
        assert_eq!(page.highlighter().outcome(), &HighlightOutcome::NoRequest);

        // Reuses the page's own input.
        let input = page.search().unwrap().input();
        assert!(page.dom.has_class(page.dom.parent(input).unwrap(), SEARCH_BOX_CLASS));

        page.type_query("ca");
        page.type_query("cats");
        page.advance(Duration::from_millis(200));
        assert_eq!(
            page.search().unwrap().state(),
            &SearchState::Rendered { query: "cats".to_string(), results: 4 }
        );

        let container = page.results_container().unwrap();
        let items = page.dom.all_by_class(container, ITEM_CLASS);
        let nav = page.click(items[2]).expect("result click navigates");
        assert_eq!(nav.url, "/posts/notes/cats.html?highlight=cats&matchNum=3");

        // Follow the navigation.
        let mut next = Page::load(
            Dom::parse(POST),
            &format!("https://blog.example{}", nav.url),
            RecordingViewport::new(),
            Config::default(),
        );
        next.advance(Duration::from_millis(500));
        assert_eq!(next.highlighter().outcome(), &HighlightOutcome::Highlighted { ordinal: 3 });
        let mark = next.dom.first_by_class(next.dom.root(), MARK_CLASS).unwrap();
        assert_eq!(next.dom.text_content(next.dom.parent(mark).unwrap()), "More cats here.");
        assert_eq!(next.location.href(), "https://blog.example/posts/notes/cats.html");

        next.run_until_idle();
        assert!(next.dom.first_by_class(next.dom.root(), MARK_CLASS).is_none());
        let fresh = Dom::parse(POST);
        assert_eq!(next.dom.to_html(next.dom.root()), fresh.to_html(fresh.root()));
    }

    #[test]
    fn test_install_search_creates_missing_input() {
        let mut page = Page::load(Dom::new(), "/posts/a.html", RecordingViewport::new(), Config::default());
        assert!(page.install_search(&index()));

        let input = page.search().unwrap().input();
        assert_eq!(page.dom.tag(input), Some("input"));
        let wrapper = page.dom.parent(input).unwrap();
        assert!(page.dom.has_class(wrapper, SEARCH_BOX_CLASS));
        assert_eq!(page.dom.parent(wrapper), Some(page.dom.body()));
        assert!(page.dom.contains(page.dom.body(), page.results_container().unwrap()));
    }

    #[test]
    fn test_malformed_index_disables_search() {
        let mut page = Page::load(Dom::new(), "/posts/a.html", RecordingViewport::new(), Config::default());
        assert!(!page.install_search(&json!({"not": "an array"})));
        assert!(page.search().is_none());

        page.type_query("cats");
        page.advance(Duration::from_secs(1));
        assert_eq!(page.dom.text_content(page.dom.body()), "");
    }

    #[test]
    fn test_uppercase_greek_query_finds_final_sigma() {
        let mut page = Page::load(Dom::new(), "/", RecordingViewport::new(), Config::default());
        assert!(page.install_search(&json!([{"path": "a", "content": "Η ΟΔΟΣ ΕΙΝΑΙ"}])));
        page.type_query("ΟΔΟΣ");
        page.advance(Duration::from_millis(200));
        assert_eq!(
            page.search().unwrap().state(),
            &SearchState::Rendered { query: "οδος".to_string(), results: 1 }
        );
        let container = page.results_container().unwrap();
        let mark = page.dom.first_by_class(container, "highlight").unwrap();
        assert_eq!(page.dom.text_content(mark), "ΟΔΟΣ");
    }

    #[test]
    fn test_click_outside_hides_results() {
        let mut page = Page::load(Dom::parse(POST), "/posts/x.html", RecordingViewport::new(), Config::default());
        page.install_search(&index());
        page.type_query("dogs");
        page.advance(Duration::from_millis(200));

        let container = page.results_container().unwrap();
        assert!(page.dom.has_class(container, "active"));
        let paragraph = page.dom.first_by_tag(page.dom.root(), "p").unwrap();
        assert_eq!(page.click(paragraph), None);
        assert!(!page.dom.has_class(container, "active"));
    }
}
