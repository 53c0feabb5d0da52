//! In-memory host
//!
//! A small element tree with explicit layout boxes, a scrollable viewport, a
//! location/history stack and recorders for emitted events and mutation
//! records. It backs the test suites and the CLI simulator.
//!
//! Layout is declared, not computed: every element that matters for scrolling
//! gets a box via [`MemoryDocument::set_layout`] (document coordinates) or
//! [`MemoryDocument::set_fixed_layout`] (viewport coordinates).
//!
//! ```rust
//! use waymark_core::document::{Document, Viewport};
//! use waymark_core::memory::MemoryDocument;
//!
//! let mut doc = MemoryDocument::new(800.0);
//! let pricing = doc.add_section("pricing", 1200.0, 400.0);
//! doc.set_content_height(3000.0);
//! doc.scroll_to(1000.0);
//! assert_eq!(doc.bounding_rect(pricing).map(|r| r.top), Some(200.0));
//! ```

use indexmap::IndexMap;
use slotmap::SlotMap;
use url::Url;

use crate::document::{Document, DocumentId, NodeId, Rect, Viewport, Window};
use crate::events::{Mutation, NavEvent};
use crate::selector::{Selector, SelectorSubject, SelectorTree};

pub const DEFAULT_URL: &str = "https://shop.example/";

/// Declared layout of an element
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutBox {
    pub top: f32,
    pub height: f32,
    /// Positioned against the viewport (`position: fixed`)
    pub fixed: bool,
}

#[derive(Debug, Clone)]
struct MemoryNode {
    tag: String,
    attributes: IndexMap<String, String>,
    styles: IndexMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Option<LayoutBox>,
}

impl MemoryNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            styles: IndexMap::new(),
            text: None,
            parent: None,
            children: Vec::new(),
            layout: None,
        }
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace())
            .into_iter()
            .flatten()
    }
}

impl SelectorSubject for MemoryNode {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// The node arena seen as a tree for selector matching
struct NodeTree<'a>(&'a SlotMap<NodeId, MemoryNode>);

impl SelectorTree for NodeTree<'_> {
    type Node = NodeId;
    type Subject = MemoryNode;

    fn subject(&self, node: NodeId) -> Option<&MemoryNode> {
        self.0.get(node)
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.0.get(node)?.parent
    }
}

/// Browser stand-in for tests and simulation
///
/// A clone is a separate page: it gets its own [`DocumentId`], so a
/// controller can be installed on it independently of the original.
#[derive(Debug)]
pub struct MemoryDocument {
    id: DocumentId,
    nodes: SlotMap<NodeId, MemoryNode>,
    body: NodeId,
    scroll_y: f32,
    viewport_height: f32,
    content_height: Option<f32>,
    reduced_motion: bool,
    history: Vec<Url>,
    history_index: usize,
    events: Vec<NavEvent>,
    mutations: Vec<Mutation>,
}

impl Clone for MemoryDocument {
    fn clone(&self) -> Self {
        Self {
            id: DocumentId::next(),
            nodes: self.nodes.clone(),
            body: self.body,
            scroll_y: self.scroll_y,
            viewport_height: self.viewport_height,
            content_height: self.content_height,
            reduced_motion: self.reduced_motion,
            history: self.history.clone(),
            history_index: self.history_index,
            events: self.events.clone(),
            mutations: self.mutations.clone(),
        }
    }
}

impl MemoryDocument {
    /// Empty page at [`DEFAULT_URL`]
    pub fn new(viewport_height: f32) -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(MemoryNode::new("body"));
        let location = Url::parse(DEFAULT_URL).expect("default url is valid");
        Self {
            id: DocumentId::next(),
            nodes,
            body,
            scroll_y: 0.0,
            viewport_height,
            content_height: None,
            reduced_motion: false,
            history: vec![location],
            history_index: 0,
            events: Vec::new(),
            mutations: Vec::new(),
        }
    }

    /// Empty page at `url`
    pub fn with_url(viewport_height: f32, url: &str) -> Result<Self, url::ParseError> {
        let mut doc = Self::new(viewport_height);
        doc.history = vec![Url::parse(url)?];
        Ok(doc)
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create an element and attach it under `parent`
    pub fn add_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append_child(parent, node);
        node
    }

    /// Append a `section.section-anchor#id` to the body with a layout box
    pub fn add_section(&mut self, id: &str, top: f32, height: f32) -> NodeId {
        let node = self.create_element("section");
        self.set_attribute(node, "id", id);
        self.set_attribute(node, "class", "section-anchor");
        self.set_layout(node, top, height);
        self.append_child(self.body, node);
        node
    }

    /// Box in document coordinates
    pub fn set_layout(&mut self, node: NodeId, top: f32, height: f32) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.layout = Some(LayoutBox {
                top,
                height,
                fixed: false,
            });
        }
    }

    /// Box in viewport coordinates, unaffected by scrolling
    pub fn set_fixed_layout(&mut self, node: NodeId, top: f32, height: f32) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.layout = Some(LayoutBox {
                top,
                height,
                fixed: true,
            });
        }
    }

    pub fn layout(&self, node: NodeId) -> Option<LayoutBox> {
        self.nodes.get(node)?.layout
    }

    /// Detach `node` (and its subtree) from its parent
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) else {
            return;
        };
        let was_connected = self.is_connected(parent);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = None;
        }
        if was_connected {
            self.mutations.push(Mutation::child_list(parent));
        }
    }

    /// Fix the document's scroll height instead of deriving it from layout
    pub fn set_content_height(&mut self, height: f32) {
        self.content_height = Some(height);
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height;
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(|n| n.tag.as_str())
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node)?.text.as_deref()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.nodes.get(node)?.styles.get(property).map(String::as_str)
    }

    /// Simulate the browser back button; the caller delivers `PopState`
    pub fn back(&mut self) -> Option<&Url> {
        if self.history_index == 0 {
            return None;
        }
        self.history_index -= 1;
        self.history.get(self.history_index)
    }

    /// Simulate the browser forward button
    pub fn forward(&mut self) -> Option<&Url> {
        if self.history_index + 1 >= self.history.len() {
            return None;
        }
        self.history_index += 1;
        self.history.get(self.history_index)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn events(&self) -> &[NavEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<NavEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drain recorded mutation records, as a MutationObserver batch would
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    fn current_url(&self) -> &Url {
        &self.history[self.history_index]
    }

    fn record(&mut self, mutation: Mutation) {
        if self.is_connected(mutation.target) {
            self.mutations.push(mutation);
        }
    }

    fn walk(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if let Some(n) = self.nodes.get(node) {
            out.push(node);
            for &child in &n.children {
                self.walk(child, out);
            }
        }
    }

    fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.walk(self.body, &mut out);
        out
    }

    fn drop_subtree(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.remove(node) {
            for child in n.children {
                self.drop_subtree(child);
            }
        }
    }

    fn max_scroll(&self) -> f32 {
        (self.scroll_height() - self.viewport_height).max(0.0)
    }
}

impl Document for MemoryDocument {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId> {
        let tree = NodeTree(&self.nodes);
        self.document_order()
            .into_iter()
            .filter(|&id| selector.matches_in(&tree, id))
            .collect()
    }

    fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|&n| self.nodes.get(n).and_then(|n| n.attribute("id")) == Some(id))
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches_in(&NodeTree(&self.nodes), node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(node)?.attributes.get(name).cloned()
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.nodes
            .get(node)
            .map(|n| {
                n.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.is_connected(node) {
            return None;
        }
        let rect = match self.nodes.get(node)?.layout {
            Some(LayoutBox {
                top,
                height,
                fixed: true,
            }) => Rect::new(top, height),
            Some(LayoutBox { top, height, .. }) => Rect::new(top - self.scroll_y, height),
            None => Rect::default(),
        };
        Some(rect)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes.get(node).is_some_and(|n| n.has_class(class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        if n.has_class(class) {
            return;
        }
        let value = match n.attributes.get("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        n.attributes.insert("class".into(), value);
        self.record(Mutation::attribute(node, "class"));
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        if !n.has_class(class) {
            return;
        }
        let value = n
            .classes()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        n.attributes.insert("class".into(), value);
        self.record(Mutation::attribute(node, "class"));
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(MemoryNode::new(tag))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.attributes.insert(name.to_string(), value.to_string());
        self.record(Mutation::attribute(node, name));
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.text = Some(text.to_string());
        self.record(Mutation::child_list(node));
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.styles.insert(property.to_string(), value.to_string());
        self.record(Mutation::attribute(node, "style"));
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.nodes.contains_key(parent) || self.contains(child, parent) {
            return;
        }
        if self.parent(child).is_some() {
            self.remove(child);
        }
        let Some(c) = self.nodes.get_mut(child) else {
            return;
        };
        c.parent = Some(parent);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        self.record(Mutation::child_list(parent));
    }

    fn clear_children(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        let children = std::mem::take(&mut n.children);
        if children.is_empty() {
            return;
        }
        for child in children {
            self.drop_subtree(child);
        }
        self.record(Mutation::child_list(node));
    }
}

impl Viewport for MemoryDocument {
    fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    fn scroll_to(&mut self, y: f32) {
        self.scroll_y = y.clamp(0.0, self.max_scroll());
    }

    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn scroll_height(&self) -> f32 {
        let content = self.content_height.unwrap_or_else(|| {
            self.nodes
                .iter()
                .filter(|(id, _)| self.is_connected(*id))
                .filter_map(|(_, n)| n.layout)
                .filter(|layout| !layout.fixed)
                .map(|layout| layout.top + layout.height)
                .fold(0.0, f32::max)
        });
        content.max(self.viewport_height)
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }
}

impl Window for MemoryDocument {
    fn location(&self) -> Url {
        self.current_url().clone()
    }

    fn replace_state(&mut self, url: &Url) {
        self.history[self.history_index] = url.clone();
    }

    fn push_state(&mut self, url: &Url) {
        self.history.truncate(self.history_index + 1);
        self.history.push(url.clone());
        self.history_index = self.history.len() - 1;
    }

    fn dispatch(&mut self, event: &NavEvent) {
        self.events.push(event.clone());
    }
}
