//! Host seams
//!
//! The engine never talks to a concrete DOM. Everything it reads or writes goes
//! through these traits, implemented by a browser binding or by
//! [`MemoryDocument`](crate::memory::MemoryDocument).
//!
//! ```text
//! Document  - element queries, attributes, layout boxes, menu mutation
//! Viewport  - scroll position and metrics, reduced-motion preference
//! Window    - location, history, outgoing events (extends Viewport)
//! Host      - Document + Window, what the controller is generic over
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use slotmap::new_key_type;
use url::Url;

use crate::events::NavEvent;
use crate::selector::Selector;

new_key_type! {
    /// Handle to an element owned by the host document
    pub struct NodeId;
}

/// Identity of a document, used to guard against double initialization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DocumentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Vertical extent of an element relative to the viewport top
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub top: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Element tree access
pub trait Document {
    fn document_id(&self) -> DocumentId;

    /// All elements matching `selector`, in document order
    fn query_selector_all(&self, selector: &Selector) -> Vec<NodeId>;

    /// First element matching `selector` in document order
    fn query_selector(&self, selector: &Selector) -> Option<NodeId> {
        self.query_selector_all(selector).into_iter().next()
    }

    fn get_element_by_id(&self, id: &str) -> Option<NodeId>;

    fn matches(&self, node: NodeId, selector: &Selector) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Nearest inclusive ancestor matching `selector`
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if self.matches(candidate, selector) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// True when `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// Whether the element is still attached to the document
    fn is_connected(&self, node: NodeId) -> bool;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// All attributes of an element in source order
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Current layout box relative to the viewport
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&mut self, node: NodeId, class: &str);

    fn remove_class(&mut self, node: NodeId, class: &str);

    fn create_element(&mut self, tag: &str) -> NodeId;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn set_text(&mut self, node: NodeId, text: &str);

    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Detach and drop every child of `node`
    fn clear_children(&mut self, node: NodeId);
}

/// The scrolling viewport
pub trait Viewport {
    fn scroll_y(&self) -> f32;

    /// Jump to an absolute position; the host clamps to its scroll range
    fn scroll_to(&mut self, y: f32);

    fn viewport_height(&self) -> f32;

    /// Total scrollable height of the document
    fn scroll_height(&self) -> f32;

    /// `prefers-reduced-motion: reduce`
    fn prefers_reduced_motion(&self) -> bool;
}

/// Browser window services beyond scrolling
pub trait Window: Viewport {
    fn location(&self) -> Url;

    /// Rewrite the current history entry
    fn replace_state(&mut self, url: &Url);

    /// Add a history entry
    fn push_state(&mut self, url: &Url);

    /// Deliver an engine event to other in-page subscribers
    fn dispatch(&mut self, event: &NavEvent);
}

/// Everything the navigation controller needs from its environment
pub trait Host: Document + Window {}

impl<T: Document + Window> Host for T {}
