//! Anchor discovery
//!
//! An anchor is a navigable section of the page: an element matching the
//! anchor selector (`.section-anchor[id]` by default). Optional per-element
//! attributes:
//!
//! - `data-anchor-name` - menu label (falls back to the id with hyphens as spaces)
//! - `data-show-in-nav="false"` - keep the anchor scrollable but out of the menu
//! - `data-scroll-offset` - pixel offset overriding the global one when non-zero

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{parse_int, saturate_i32};
use crate::document::{Document, NodeId};
use crate::error::RegistryError;
use crate::selector::Selector;

pub const ATTR_ANCHOR_NAME: &str = "data-anchor-name";
pub const ATTR_SHOW_IN_NAV: &str = "data-show-in-nav";
pub const ATTR_SCROLL_OFFSET: &str = "data-scroll-offset";

/// A navigable section
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Anchor {
    pub id: String,
    pub display_name: String,
    /// Non-owning handle; the document owns the element
    #[serde(skip)]
    pub element: NodeId,
    pub visible_in_menu: bool,
    pub scroll_offset_override: Option<i32>,
}

impl Anchor {
    /// The override, if it should take precedence over the global offset
    pub fn effective_override(&self) -> Option<i32> {
        self.scroll_offset_override.filter(|px| *px != 0)
    }
}

/// `"shipping-and-returns"` → `"shipping and returns"`
pub fn display_name_from_id(id: &str) -> String {
    id.replace('-', " ")
}

/// Ordered snapshot of the page's anchors
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    selector: Selector,
    anchors: Vec<Anchor>,
    index: FxHashMap<String, usize>,
}

impl AnchorRegistry {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            anchors: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Read the anchors currently in the document
    ///
    /// Pure: does not touch the registry's snapshot, so it is safe to call from
    /// mutation callbacks. Duplicate ids keep their first occurrence.
    pub fn discover<D: Document + ?Sized>(&self, doc: &D) -> Vec<Anchor> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut anchors = Vec::new();

        for node in doc.query_selector_all(&self.selector) {
            let Some(id) = doc.attribute(node, "id").filter(|id| !id.is_empty()) else {
                continue;
            };
            if !seen.insert(id.clone()) {
                warn!(anchor = %id, "duplicate anchor id, keeping the first occurrence");
                continue;
            }
            anchors.push(read_anchor(doc, node, id));
        }

        debug!(count = anchors.len(), "discovered anchors");
        anchors
    }

    /// Replace the snapshot with a fresh discovery
    pub fn refresh<D: Document + ?Sized>(&mut self, doc: &D) -> &[Anchor] {
        self.anchors = self.discover(doc);
        self.index = self
            .anchors
            .iter()
            .enumerate()
            .map(|(i, anchor)| (anchor.id.clone(), i))
            .collect();
        &self.anchors
    }

    /// Report duplicate ids among marked sections
    pub fn validate<D: Document + ?Sized>(&self, doc: &D) -> Result<(), RegistryError> {
        // First-seen order keeps the reported id stable
        let mut order: Vec<String> = Vec::new();
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        for node in doc.query_selector_all(&self.selector) {
            let Some(id) = doc.attribute(node, "id").filter(|id| !id.is_empty()) else {
                continue;
            };
            let count = counts.entry(id).or_insert_with_key(|id| {
                order.push(id.clone());
                0
            });
            *count += 1;
        }
        for id in order {
            let count = counts[&id];
            if count > 1 {
                return Err(RegistryError::DuplicateId { id, count });
            }
        }
        Ok(())
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Anchors that get a menu entry, in document order
    pub fn visible(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter().filter(|a| a.visible_in_menu)
    }

    pub fn find(&self, id: &str) -> Option<&Anchor> {
        self.index.get(id).map(|&i| &self.anchors[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

fn read_anchor<D: Document + ?Sized>(doc: &D, node: NodeId, id: String) -> Anchor {
    let display_name = doc
        .attribute(node, ATTR_ANCHOR_NAME)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| display_name_from_id(&id));

    let visible_in_menu = doc
        .attribute(node, ATTR_SHOW_IN_NAV)
        .map_or(true, |v| v.trim() != "false");

    let scroll_offset_override = doc
        .attribute(node, ATTR_SCROLL_OFFSET)
        .and_then(|v| parse_int(ATTR_SCROLL_OFFSET, &v).ok())
        .map(saturate_i32);

    Anchor {
        id,
        display_name,
        element: node,
        visible_in_menu,
        scroll_offset_override,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    fn registry() -> AnchorRegistry {
        AnchorRegistry::new(Selector::class("section-anchor").with_attribute("id"))
    }

    #[test]
    fn test_discover_in_document_order() {
        let mut doc = MemoryDocument::new(800.0);
        doc.add_section("intro", 0.0, 500.0);
        doc.add_section("shipping-and-returns", 500.0, 500.0);
        let pricing = doc.add_section("pricing", 1000.0, 500.0);
        doc.set_attribute(pricing, ATTR_ANCHOR_NAME, "Plans & Pricing");

        let anchors = registry().discover(&doc);
        let ids: Vec<_> = anchors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["intro", "shipping-and-returns", "pricing"]);
        assert_eq!(anchors[1].display_name, "shipping and returns");
        assert_eq!(anchors[2].display_name, "Plans & Pricing");
    }

    #[test]
    fn test_discover_reads_overrides_and_visibility() {
        let mut doc = MemoryDocument::new(800.0);
        let intro = doc.add_section("intro", 0.0, 500.0);
        let legal = doc.add_section("legal", 500.0, 500.0);
        doc.set_attribute(intro, ATTR_SCROLL_OFFSET, "120px");
        doc.set_attribute(legal, ATTR_SHOW_IN_NAV, "false");

        let anchors = registry().discover(&doc);
        assert_eq!(anchors[0].scroll_offset_override, Some(120));
        assert!(anchors[0].visible_in_menu);
        assert!(!anchors[1].visible_in_menu);
        assert_eq!(anchors[1].scroll_offset_override, None);
    }

    #[test]
    fn test_zero_override_is_not_effective() {
        let mut doc = MemoryDocument::new(800.0);
        let intro = doc.add_section("intro", 0.0, 500.0);
        doc.set_attribute(intro, ATTR_SCROLL_OFFSET, "0");

        let anchors = registry().discover(&doc);
        assert_eq!(anchors[0].scroll_offset_override, Some(0));
        assert_eq!(anchors[0].effective_override(), None);
    }

    #[test]
    fn test_empty_document() {
        let doc = MemoryDocument::new(800.0);
        let mut registry = registry();
        assert!(registry.discover(&doc).is_empty());
        assert!(registry.refresh(&doc).is_empty());
        assert!(registry.is_empty());
        assert!(registry.validate(&doc).is_ok());
    }

    #[test]
    fn test_duplicates_keep_first() {
        let mut doc = MemoryDocument::new(800.0);
        let first = doc.add_section("faq", 0.0, 100.0);
        doc.add_section("faq", 400.0, 100.0);

        let mut registry = registry();
        registry.refresh(&doc);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("faq").map(|a| a.element), Some(first));
        assert_eq!(
            registry.validate(&doc),
            Err(RegistryError::DuplicateId {
                id: "faq".into(),
                count: 2
            })
        );
    }

    #[test]
    fn test_validate_reports_first_duplicate_in_document_order() {
        let mut doc = MemoryDocument::new(800.0);
        for (i, id) in ["zeta", "alpha", "zeta", "alpha", "alpha", "omega"].iter().enumerate() {
            doc.add_section(id, i as f32 * 100.0, 100.0);
        }

        assert_eq!(
            registry().validate(&doc),
            Err(RegistryError::DuplicateId {
                id: "zeta".into(),
                count: 2
            })
        );
    }

    #[test]
    fn test_discover_is_pure() {
        let mut doc = MemoryDocument::new(800.0);
        doc.add_section("intro", 0.0, 500.0);
        doc.take_mutations();

        let registry = registry();
        let _ = registry.discover(&doc);
        assert!(registry.is_empty());
        assert_eq!(registry.discover(&doc), registry.discover(&doc));
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_unmarked_sections_are_ignored() {
        let mut doc = MemoryDocument::new(800.0);
        let body = doc.body();
        let plain = doc.add_element(body, "section");
        doc.set_attribute(plain, "id", "plain");
        doc.add_section("intro", 0.0, 500.0);

        let anchors = registry().discover(&doc);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].id, "intro");
    }
}
