//! Finds the Nth occurrence of a search query on a freshly loaded post,
//! scrolls it into view and plays a self-removing highlight.
//!
//! The request arrives as `?highlight=<query>&matchNum=<n>` and is removed
//! from the URL once processed, so a reload does not replay it.

use crate::config::Config;
use crate::dom::{Dom, DomError, NodeId};
use crate::location::Location;
use crate::matcher::{find_all_matches, Span};
use crate::timer::Scheduler;
use crate::viewport::{ScrollBlock, Viewport};

pub const HIGHLIGHT_PARAM: &str = "highlight";
pub const MATCH_NUM_PARAM: &str = "matchNum";
pub const MARK_CLASS: &str = "search-highlight";
pub const ANIMATE_CLASS: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub query: String,
    /// 1-based occurrence to mark.
    pub match_num: usize,
}

impl HighlightRequest {
    pub fn from_location(location: &Location) -> Option<Self> {
        let query = location.query_param(HIGHLIGHT_PARAM)?;
        if query.is_empty() {
            return None;
        }
        let match_num = parse_match_num(location.query_param(MATCH_NUM_PARAM).as_deref());
        Some(HighlightRequest { query, match_num })
    }
}

/// Leading decimal digits of `raw`; missing, invalid or zero means 1.
pub fn parse_match_num(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return 1;
    };
    let trimmed = raw.trim_start();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    match digits[..end].parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => 1,
    }
}

/// One occurrence of the query inside a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub node: NodeId,
    pub span: Span,
    /// 1-based position across the whole traversal.
    pub ordinal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    Found(Occurrence),
    NotFound { total: usize },
}

/// Every occurrence of `query` across `texts`, numbered in traversal order.
pub fn occurrences<'a, I>(texts: I, query: &'a str) -> impl Iterator<Item = Occurrence> + 'a
where
    I: IntoIterator<Item = (NodeId, &'a str)>,
    I::IntoIter: 'a,
{
    texts
        .into_iter()
        .flat_map(move |(node, text)| {
            find_all_matches(text, query)
                .into_iter()
                .map(move |span| (node, span))
        })
        .zip(1..)
        .map(|((node, span), ordinal)| Occurrence {
            node,
            span,
            ordinal,
        })
}

/// Pick the `n`th occurrence (1-based), counting across node boundaries.
pub fn locate_occurrence<'a, I>(texts: I, query: &'a str, n: usize) -> Located
where
    I: IntoIterator<Item = (NodeId, &'a str)>,
    I::IntoIter: 'a,
{
    let mut total = 0;
    for occurrence in occurrences(texts, query) {
        if occurrence.ordinal == n {
            return Located::Found(occurrence);
        }
        total = occurrence.ordinal;
    }
    Located::NotFound { total }
}

/// A wrapped occurrence. Releasing it puts the original text back into the
/// original text node and drops the wrapper.
#[derive(Debug)]
#[must_use = "a mark must be released to restore the text"]
pub struct HighlightMark {
    text_node: NodeId,
    element: NodeId,
    tail: NodeId,
    released: bool,
}

impl HighlightMark {
    /// Wrap `span` of `node` in `<span class="search-highlight">`.
    ///
    /// All checks run before the tree is touched, so a failed wrap leaves
    /// the document unchanged.
    pub fn wrap(dom: &mut Dom, node: NodeId, span: Span) -> Result<Self, DomError> {
        let text = dom.text(node).ok_or(DomError::NotText(node))?;
        if dom.parent(node).is_none() {
            return Err(DomError::Detached(node));
        }
        if span.is_empty() || span.end > text.len() {
            return Err(DomError::OffsetOutOfRange {
                offset: span.end,
                len: text.len(),
            });
        }
        for offset in [span.start, span.end] {
            if !text.is_char_boundary(offset) {
                return Err(DomError::NotCharBoundary(offset));
            }
        }

        let tail = dom.split_text(node, span.end)?;
        let matched = dom.split_text(node, span.start)?;
        let element = dom.create_element("span");
        dom.add_class(element, MARK_CLASS);
        dom.insert_after(node, element)?;
        dom.append_child(element, matched)?;

        Ok(HighlightMark {
            text_node: node,
            element,
            tail,
            released: false,
        })
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Unwrap the occurrence. Calling this again is a no-op.
    pub fn release(&mut self, dom: &mut Dom) -> Result<(), DomError> {
        if self.released {
            return Ok(());
        }
        let head = dom.text(self.text_node).ok_or(DomError::NotText(self.text_node))?;
        let tail = dom.text(self.tail).unwrap_or_default();
        let restored = format!("{head}{}{tail}", dom.text_content(self.element));

        dom.set_text(self.text_node, restored)?;
        dom.detach(self.element);
        dom.detach(self.tail);
        self.released = true;
        Ok(())
    }
}

/// Timer events the highlighter arms for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightEvent {
    ContentReady,
    ScrollSettled,
    Recentered,
    AnimationEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// No `highlight` parameter on the URL.
    NoRequest,
    /// Waiting for the content to settle.
    Waiting,
    NoContent,
    Highlighted { ordinal: usize },
    NotFound { requested: usize, total: usize },
}

pub struct CrossPageHighlighter {
    request: Option<HighlightRequest>,
    mark: Option<HighlightMark>,
    outcome: HighlightOutcome,
    content_class: String,
    content_wait: std::time::Duration,
    scroll_settle: std::time::Duration,
    recenter: std::time::Duration,
    recenter_tolerance_px: f64,
    animation: std::time::Duration,
}

impl CrossPageHighlighter {
    pub fn new(config: &Config) -> Self {
        CrossPageHighlighter {
            request: None,
            mark: None,
            outcome: HighlightOutcome::NoRequest,
            content_class: config.content_class.clone(),
            content_wait: config.content_wait(),
            scroll_settle: config.scroll_settle(),
            recenter: config.recenter(),
            recenter_tolerance_px: config.recenter_tolerance_px,
            animation: config.highlight_animation(),
        }
    }

    pub fn outcome(&self) -> &HighlightOutcome {
        &self.outcome
    }

    /// The wrapper element while a highlight is on screen.
    pub fn active_element(&self) -> Option<NodeId> {
        self.mark
            .as_ref()
            .filter(|m| !m.is_released())
            .map(HighlightMark::element)
    }

    /// Read the request from the URL and wait for content.
    pub fn on_load<E>(&mut self, location: &Location, timers: &mut Scheduler<E>) -> bool
    where
        E: From<HighlightEvent>,
    {
        let Some(request) = HighlightRequest::from_location(location) else {
            log::debug!("No highlight text provided");
            self.outcome = HighlightOutcome::NoRequest;
            return false;
        };

        log::debug!("Highlight request: {request:?}");
        self.request = Some(request);
        self.outcome = HighlightOutcome::Waiting;
        timers.schedule(self.content_wait, E::from(HighlightEvent::ContentReady));
        true
    }

    pub fn on_event<E>(
        &mut self,
        event: HighlightEvent,
        dom: &mut Dom,
        viewport: &mut dyn Viewport,
        location: &mut Location,
        timers: &mut Scheduler<E>,
    ) where
        E: From<HighlightEvent>,
    {
        match event {
            HighlightEvent::ContentReady => self.apply(dom, viewport, location, timers),
            HighlightEvent::ScrollSettled => {
                let Some(element) = self.active_element() else {
                    return;
                };
                let offset = viewport.center_offset(dom, element);
                if offset.abs() > self.recenter_tolerance_px {
                    log::debug!("Highlight is {offset:.0}px off center, scrolling again");
                    viewport.scroll_into_view(dom, element, ScrollBlock::Center);
                    timers.schedule(self.recenter, E::from(HighlightEvent::Recentered));
                } else {
                    self.start_animation(dom, timers);
                }
            }
            HighlightEvent::Recentered => self.start_animation(dom, timers),
            HighlightEvent::AnimationEnded => self.finish(dom),
        }
    }

    fn apply<E>(
        &mut self,
        dom: &mut Dom,
        viewport: &mut dyn Viewport,
        location: &mut Location,
        timers: &mut Scheduler<E>,
    ) where
        E: From<HighlightEvent>,
    {
        let Some(request) = self.request.take() else {
            return;
        };
        let located = self.locate(dom, &request);
        self.apply_located(request, located, dom, viewport, location, timers);
    }

    /// Find the requested occurrence; `None` when the content region is missing.
    fn locate(&self, dom: &Dom, request: &HighlightRequest) -> Option<Located> {
        let content = dom.first_by_class(dom.root(), &self.content_class)?;
        Some(locate_occurrence(dom.text_nodes(content), &request.query, request.match_num))
    }

    fn apply_located<E>(
        &mut self,
        request: HighlightRequest,
        located: Option<Located>,
        dom: &mut Dom,
        viewport: &mut dyn Viewport,
        location: &mut Location,
        timers: &mut Scheduler<E>,
    ) where
        E: From<HighlightEvent>,
    {
        self.outcome = self.mark_occurrence(dom, &request, located);

        match &self.outcome {
            HighlightOutcome::Highlighted { ordinal } => {
                if let Some(element) = self.active_element() {
                    log::info!("Highlighted match {ordinal} of {:?}", request.query);
                    viewport.scroll_into_view(dom, element, ScrollBlock::Center);
                    timers.schedule(self.scroll_settle, E::from(HighlightEvent::ScrollSettled));
                }
            }
            HighlightOutcome::NotFound { requested, total } => {
                log::warn!(
                    "Match number {requested} not found for {:?} ({total} matches on page)",
                    request.query
                );
            }
            HighlightOutcome::NoContent => {
                log::warn!("Content element .{} not found", self.content_class);
            }
            _ => {}
        }

        let path = location.pathname.clone();
        location.replace_state(&path);
    }

    fn mark_occurrence(
        &mut self,
        dom: &mut Dom,
        request: &HighlightRequest,
        located: Option<Located>,
    ) -> HighlightOutcome {
        let Some(located) = located else {
            return HighlightOutcome::NoContent;
        };

        match located {
            Located::Found(occurrence) => match HighlightMark::wrap(dom, occurrence.node, occurrence.span) {
                Ok(mark) => {
                    self.release_current(dom);
                    self.mark = Some(mark);
                    HighlightOutcome::Highlighted {
                        ordinal: occurrence.ordinal,
                    }
                }
                Err(e) => {
                    log::error!("Error creating highlight: {e}");
                    HighlightOutcome::NotFound {
                        requested: request.match_num,
                        total: occurrence.ordinal,
                    }
                }
            },
            Located::NotFound { total } => HighlightOutcome::NotFound {
                requested: request.match_num,
                total,
            },
        }
    }

    fn start_animation<E>(&mut self, dom: &mut Dom, timers: &mut Scheduler<E>)
    where
        E: From<HighlightEvent>,
    {
        let Some(element) = self.active_element() else {
            return;
        };
        dom.add_class(element, ANIMATE_CLASS);
        log::debug!("Highlight animation activated");
        timers.schedule(self.animation, E::from(HighlightEvent::AnimationEnded));
    }

    fn finish(&mut self, dom: &mut Dom) {
        self.release_current(dom);
        log::debug!("Highlight element removed");
    }

    fn release_current(&mut self, dom: &mut Dom) {
        if let Some(mut mark) = self.mark.take() {
            if let Err(e) = mark.release(dom) {
                log::error!("Failed to remove highlight: {e}");
            }
        }
    }
}
