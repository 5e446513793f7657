//! In-page handling for internal and footnote links.
//!
//! A link that points at the current page scrolls to its fragment target and
//! flashes it instead of reloading.

use crate::config::Config;
use crate::controller::Navigation;
use crate::dom::{Dom, NodeId};
use crate::location::Location;
use crate::timer::Scheduler;
use crate::viewport::{ScrollBlock, Viewport};

pub const HEADING_HIGHLIGHT_CLASS: &str = "heading-highlight";
const LINK_CLASSES: &[&str] = &["internal-link", "footnote-link"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    ClearHeadingHighlight(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClick {
    /// Not a link we handle; the default action applies.
    Ignored,
    /// Same-page link; default navigation suppressed.
    SamePage { target: Option<NodeId> },
    /// Link to another page.
    Navigate(Navigation),
}

pub struct LinkNavigator {
    highlight_for: std::time::Duration,
}

impl LinkNavigator {
    pub fn new(config: &Config) -> Self {
        LinkNavigator {
            highlight_for: config.heading_highlight(),
        }
    }

    pub fn on_click<E>(
        &self,
        dom: &mut Dom,
        target: NodeId,
        location: &Location,
        viewport: &mut dyn Viewport,
        timers: &mut Scheduler<E>,
    ) -> LinkClick
    where
        E: From<LinkEvent>,
    {
        let Some(link) = find_link(dom, target) else {
            return LinkClick::Ignored;
        };
        let href = match dom.attr(link, "href") {
            Some(href) if !href.is_empty() => href.to_string(),
            _ => return LinkClick::Ignored,
        };

        let resolved = location.resolve(&href);
        if resolved.pathname != location.pathname {
            return LinkClick::Navigate(Navigation {
                url: resolved.href(),
            });
        }

        let Some(fragment) = resolved.hash.strip_prefix('#') else {
            return LinkClick::SamePage { target: None };
        };
        let element = dom.element_by_id(fragment).or_else(|| {
            urlencoding::decode(fragment)
                .ok()
                .and_then(|decoded| dom.element_by_id(&decoded))
        });

        match element {
            Some(element) => {
                viewport.scroll_into_view(dom, element, ScrollBlock::Start);
                dom.add_class(element, HEADING_HIGHLIGHT_CLASS);
                timers.schedule(
                    self.highlight_for,
                    E::from(LinkEvent::ClearHeadingHighlight(element)),
                );
                LinkClick::SamePage {
                    target: Some(element),
                }
            }
            None => {
                log::debug!("No element with id {fragment:?}");
                LinkClick::SamePage { target: None }
            }
        }
    }

    pub fn on_event(&self, event: LinkEvent, dom: &mut Dom) {
        match event {
            LinkEvent::ClearHeadingHighlight(element) => {
                dom.remove_class(element, HEADING_HIGHLIGHT_CLASS);
            }
        }
    }
}

/// The clicked `<a>`, or the nearest internal/footnote link around it.
fn find_link(dom: &Dom, target: NodeId) -> Option<NodeId> {
    if dom.tag(target) == Some("a") {
        return Some(target);
    }
    dom.closest(target, |d, n| {
        d.tag(n) == Some("a") && LINK_CLASSES.iter().any(|c| d.has_class(n, c))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::RecordingViewport;
    use std::time::Duration;

    const PAGE: &str = "<html><body><div class=\"content-wrapper\"><h2 id=\"setup\">Setup</h2><p><a class=\"internal-link\" href=\"#setup\"><span>jump</span></a> <a href=\"other.html#x\">away</a> <a class=\"footnote-link\" href=\"/posts/rust.html#fn%201\">1</a> <span class=\"plain\">text</span></p><p id=\"fn 1\">Footnote</p></div></body></html>";

    fn by_text(dom: &Dom, text: &str) -> NodeId {
        dom.text_nodes(dom.root())
            .find(|(_, t)| *t == text)
            .map(|(n, _)| n)
            .unwrap()
    }

    #[test]
    fn test_same_page_fragment_flashes_target() {
        let mut dom = Dom::parse(PAGE);
        let location = Location::parse("https://blog.example/posts/rust.html");
        let mut viewport = RecordingViewport::new();
        let mut timers: Scheduler<LinkEvent> = Scheduler::new();
        let nav = LinkNavigator::new(&Config::default());

        let click_on = by_text(&dom, "jump");
        let outcome = nav.on_click(&mut dom, click_on, &location, &mut viewport, &mut timers);
        let heading = dom.element_by_id("setup").unwrap();
        assert_eq!(outcome, LinkClick::SamePage { target: Some(heading) });
        assert!(dom.has_class(heading, HEADING_HIGHLIGHT_CLASS));
        assert_eq!(viewport.scrolls[0].block, ScrollBlock::Start);

        assert!(timers.pop_due(Duration::from_millis(1499)).is_none());
        let (_, event) = timers.pop_due(Duration::from_millis(1500)).unwrap();
        nav.on_event(event, &mut dom);
        assert!(!dom.has_class(heading, HEADING_HIGHLIGHT_CLASS));
    }

    #[test]
    fn test_other_page_link_navigates() {
        let mut dom = Dom::parse(PAGE);
        let location = Location::parse("https://blog.example/posts/rust.html");
        let mut viewport = RecordingViewport::new();
        let mut timers: Scheduler<LinkEvent> = Scheduler::new();
        let nav = LinkNavigator::new(&Config::default());

        let anchor = dom.closest(by_text(&dom, "away"), |d, n| d.tag(n) == Some("a")).unwrap();
        let outcome = nav.on_click(&mut dom, anchor, &location, &mut viewport, &mut timers);
        assert_eq!(
            outcome,
            LinkClick::Navigate(Navigation { url: "https://blog.example/posts/other.html#x".to_string() })
        );
        assert!(viewport.scrolls.is_empty());
    }

    #[test]
    fn test_encoded_fragment_and_non_links() {
        let mut dom = Dom::parse(PAGE);
        let location = Location::parse("https://blog.example/posts/rust.html");
        let mut viewport = RecordingViewport::new();
        let mut timers: Scheduler<LinkEvent> = Scheduler::new();
        let nav = LinkNavigator::new(&Config::default());

        let footnote = by_text(&dom, "1");
        let outcome = nav.on_click(&mut dom, footnote, &location, &mut viewport, &mut timers);
        let target = dom.element_by_id("fn 1");
        assert_eq!(outcome, LinkClick::SamePage { target });

        let plain = by_text(&dom, "text");
        assert_eq!(
            nav.on_click(&mut dom, plain, &location, &mut viewport, &mut timers),
            LinkClick::Ignored
        );
    }
}
