//! A small arena document tree standing in for the browser DOM.
//!
//! Detaching a node keeps its slot alive so it can be reattached.
//! `clear_children` drops the removed subtrees and recycles their slots, so
//! repainting a container does not grow the arena. `NodeId`s are minted by one
//! `Dom` and must not be used with another.

use scraper::{ElementRef, Html};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("node {0:?} has no parent")]
    Detached(NodeId),

    #[error("offset {offset} is out of range for text of length {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("cannot insert {child:?} under {parent:?}")]
    Hierarchy { parent: NodeId, child: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text is never page content.
const OPAQUE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    /// Slots released by `clear_children`, reused by the next allocation.
    free: Vec<usize>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// An empty document with `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let mut dom = Dom {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            free: Vec::new(),
        };
        let html = dom.create_element("html");
        dom.attach(dom.root(), html);
        let head = dom.create_element("head");
        dom.attach(html, head);
        let body = dom.create_element("body");
        dom.attach(html, body);
        dom
    }

    /// Parse an HTML document into the arena.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut dom = Dom {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            free: Vec::new(),
        };
        let root = dom.root();
        dom.import_element(root, parsed.root_element());
        dom
    }

    fn import_element(&mut self, parent: NodeId, element: ElementRef<'_>) {
        let id = self.create_element(element.value().name());
        for (name, value) in element.value().attrs() {
            self.set_attr(id, name, value);
        }
        self.attach(parent, id);

        for child in element.children() {
            match child.value() {
                scraper::Node::Text(text) => {
                    let node = self.create_text(&**text);
                    self.attach(id, node);
                }
                scraper::Node::Element(_) => {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        self.import_element(id, child_element);
                    }
                }
                _ => {}
            }
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn body(&self) -> NodeId {
        self.first_by_tag(self.root(), "body").unwrap_or(self.root())
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            return NodeId(slot);
        }
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of live nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Append a freshly created, parentless node.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, node: NodeId, value: impl Into<String>) -> Result<(), DomError> {
        match &mut self.nodes[node.0].data {
            NodeData::Text(text) => {
                *text = value.into();
                Ok(())
            }
            _ => Err(DomError::NotText(node)),
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.tag(node).is_none() || self.has_class(node, class) {
            return;
        }
        let value = match self.attr(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attr(node, "class", &value);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(existing) = self.attr(node, "class") else {
            return;
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr(node, "class");
        } else {
            let value = remaining.join(" ");
            self.set_attr(node, "class", &value);
        }
    }

    /// Like `Node.contains`: true when `node` is `ancestor` or inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Nearest inclusive ancestor satisfying `pred`.
    pub fn closest<F>(&self, node: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut current = Some(node);
        while let Some(n) = current {
            if pred(self, n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.contains(child, parent) || self.text(parent).is_some() {
            return Err(DomError::Hierarchy { parent, child });
        }
        self.detach(child);
        self.attach(parent, child);
        Ok(())
    }

    /// Insert `node` directly after `reference` in its parent.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        if self.contains(node, parent) {
            return Err(DomError::Hierarchy { parent, child: node });
        }
        self.detach(node);
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::Detached(reference))?;
        siblings.insert(pos + 1, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Remove and free every descendant of `node`.
    ///
    /// Ids of the removed nodes become invalid and may be handed out again.
    pub fn clear_children(&mut self, node: NodeId) {
        let mut stack = std::mem::take(&mut self.nodes[node.0].children);
        while let Some(child) = stack.pop() {
            let freed = std::mem::replace(
                &mut self.nodes[child.0],
                Node {
                    data: NodeData::Text(String::new()),
                    parent: None,
                    children: Vec::new(),
                },
            );
            stack.extend(freed.children);
            self.free.push(child.0);
        }
    }

    /// Split a text node at byte `offset`, like `Text.splitText`.
    ///
    /// The original node keeps the head; the returned node holds the tail and
    /// is inserted right after it.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(node).ok_or(DomError::NotText(node))?;
        if offset > text.len() {
            return Err(DomError::OffsetOutOfRange {
                offset,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(offset) {
            return Err(DomError::NotCharBoundary(offset));
        }
        if self.parent(node).is_none() {
            return Err(DomError::Detached(node));
        }

        let tail = text[offset..].to_string();
        let head = text[..offset].to_string();
        let tail_node = self.create_text(tail);
        self.insert_after(node, tail_node)?;
        self.set_text(node, head)?;
        Ok(tail_node)
    }

    /// Pre-order walk of `root` and everything under it.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            stack: vec![root],
            skip_opaque: false,
        }
    }

    /// Text nodes under `root` in document order, skipping script-like
    /// elements. The walk is lazy.
    pub fn text_nodes(&self, root: NodeId) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        Descendants {
            dom: self,
            stack: vec![root],
            skip_opaque: true,
        }
        .filter_map(move |n| self.text(n).map(|t| (n, t)))
    }

    pub fn first_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(root).find(|&n| self.has_class(n, class))
    }

    pub fn all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    pub fn first_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(root).find(|&n| self.tag(n) == Some(tag))
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Serialize `node` and its subtree.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Document => {
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
            }
            NodeData::Text(text) => {
                let raw = self
                    .parent(node)
                    .and_then(|p| self.tag(p))
                    .map(|t| t == "script" || t == "style")
                    .unwrap_or(false);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_html(text));
                }
            }
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {name}=\"{}\"", escape_html(value)));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

pub struct Descendants<'a> {
    dom: &'a Dom,
    stack: Vec<NodeId>,
    skip_opaque: bool,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        let opaque = self.skip_opaque
            && self
                .dom
                .tag(node)
                .map(|t| OPAQUE_ELEMENTS.contains(&t))
                .unwrap_or(false);
        if !opaque {
            self.stack.extend(self.dom.children(node).iter().rev());
        }
        Some(node)
    }
}

/// Escape text for use in HTML content or a double-quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
