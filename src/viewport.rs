use std::collections::VecDeque;

use crate::dom::{Dom, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
}

/// The scrolling surface the page is shown in.
pub trait Viewport {
    /// Start a smooth scroll that brings `node` to `block`.
    fn scroll_into_view(&mut self, dom: &Dom, node: NodeId, block: ScrollBlock);

    /// Vertical distance in pixels between `node` and the viewport center.
    fn center_offset(&mut self, dom: &Dom, node: NodeId) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollCall {
    pub node: NodeId,
    pub block: ScrollBlock,
}

/// Viewport without layout. Records every scroll request and answers
/// center-offset measurements from a script, then with 0.
#[derive(Debug, Default)]
pub struct RecordingViewport {
    pub scrolls: Vec<ScrollCall>,
    offsets: VecDeque<f64>,
}

impl RecordingViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offsets(offsets: impl IntoIterator<Item = f64>) -> Self {
        RecordingViewport {
            scrolls: Vec::new(),
            offsets: offsets.into_iter().collect(),
        }
    }
}

impl Viewport for RecordingViewport {
    fn scroll_into_view(&mut self, dom: &Dom, node: NodeId, block: ScrollBlock) {
        log::debug!(
            "Scrolling {:?} <{}> to {block:?}",
            node,
            dom.tag(node).unwrap_or("#text")
        );
        self.scrolls.push(ScrollCall { node, block });
    }

    fn center_offset(&mut self, _dom: &Dom, _node: NodeId) -> f64 {
        self.offsets.pop_front().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_viewport_script() {
        let dom = Dom::new();
        let body = dom.body();
        let mut viewport = RecordingViewport::with_offsets([42.0]);
        viewport.scroll_into_view(&dom, body, ScrollBlock::Center);
        assert_eq!(viewport.scrolls, vec![ScrollCall { node: body, block: ScrollBlock::Center }]);
        assert_eq!(viewport.center_offset(&dom, body), 42.0);
        assert_eq!(viewport.center_offset(&dom, body), 0.0);
    }
}
