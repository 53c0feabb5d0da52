//! Navigation menu synthesis
//!
//! The menu is rebuilt from scratch on every refresh, never patched:
//!
//! ```text
//! <div class="anchor-navigation">                 (container, host-provided)
//!   <nav class="anchor-nav-list" aria-label="Page navigation">
//!     <ul class="anchor-nav-items">
//!       <li class="anchor-nav-item">
//!         <a class="anchor-nav-link" href="#intro" data-anchor-target="intro"
//!            aria-label="Go to Intro">
//!           <span class="anchor-nav-label">Intro</span>
//!         </a>
//!       </li>
//!       ...
//! ```
//!
//! The subtree is assembled detached and attached in one append, so a
//! mutation observer sees a single child-list change on the container.

use std::time::Duration;

use tracing::debug;
use waymark_core::{Anchor, Configuration, Debouncer, Document, NodeId, Selector, TimerId, Timers};

pub const ATTR_ANCHOR_TARGET: &str = "data-anchor-target";

/// One rendered link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub anchor_id: String,
    pub link: NodeId,
    /// The `<li>` wrapping the link
    pub item: NodeId,
}

/// Builds and refreshes the menu inside the configured container
#[derive(Debug, Clone)]
pub struct MenuBuilder {
    container_selector: Selector,
    menu_label: String,
    link_label_prefix: String,
    container: Option<NodeId>,
    entries: Vec<MenuEntry>,
    debouncer: Debouncer,
}

impl MenuBuilder {
    pub fn new(config: &Configuration) -> Self {
        Self {
            container_selector: config.menu_selector.clone(),
            menu_label: config.menu_label.clone(),
            link_label_prefix: config.link_label_prefix.clone(),
            container: None,
            entries: Vec::new(),
            debouncer: Debouncer::new(Duration::from_millis(config.rebuild_debounce_ms as u64)),
        }
    }

    /// The container found by the last rebuild
    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn entry(&self, anchor_id: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.anchor_id == anchor_id)
    }

    /// Whether `node` lives inside the menu container
    pub fn owns<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        self.container.is_some_and(|c| doc.contains(c, node))
    }

    /// Clear the container and render one entry per menu-visible anchor
    ///
    /// Returns the number of entries rendered.
    pub fn rebuild<D: Document + ?Sized>(&mut self, doc: &mut D, anchors: &[Anchor]) -> usize {
        self.entries.clear();
        self.container = doc.query_selector(&self.container_selector);
        let Some(container) = self.container else {
            debug!(selector = %self.container_selector, "no menu container");
            return 0;
        };

        doc.clear_children(container);

        let visible: Vec<&Anchor> = anchors.iter().filter(|a| a.visible_in_menu).collect();
        if visible.is_empty() {
            debug!("no menu-visible anchors, menu left empty");
            return 0;
        }

        let nav = doc.create_element("nav");
        doc.set_attribute(nav, "class", "anchor-nav-list");
        doc.set_attribute(nav, "aria-label", &self.menu_label);

        let list = doc.create_element("ul");
        doc.set_attribute(list, "class", "anchor-nav-items");

        for anchor in visible {
            let item = doc.create_element("li");
            doc.set_attribute(item, "class", "anchor-nav-item");

            let link = doc.create_element("a");
            doc.set_attribute(link, "href", &format!("#{}", anchor.id));
            doc.set_attribute(link, "class", "anchor-nav-link");
            doc.set_attribute(link, ATTR_ANCHOR_TARGET, &anchor.id);
            doc.set_attribute(
                link,
                "aria-label",
                &format!("{} {}", self.link_label_prefix, anchor.display_name),
            );

            let label = doc.create_element("span");
            doc.set_attribute(label, "class", "anchor-nav-label");
            doc.set_text(label, &anchor.display_name);

            doc.append_child(link, label);
            doc.append_child(item, link);
            doc.append_child(list, item);

            self.entries.push(MenuEntry {
                anchor_id: anchor.id.clone(),
                link,
                item,
            });
        }

        doc.append_child(nav, list);
        doc.append_child(container, nav);

        debug!(entries = self.entries.len(), "menu rebuilt");
        self.entries.len()
    }

    /// Debounced rebuild request; bursts collapse into one `task` firing
    pub fn schedule_rebuild<T>(&mut self, timers: &mut Timers<T>, now: Duration, task: T) -> TimerId {
        self.debouncer.trigger(timers, now, task)
    }

    /// Whether a fired timer is the pending rebuild (clears it if so)
    pub fn rebuild_fired(&mut self, id: TimerId) -> bool {
        self.debouncer.fired(id)
    }

    pub fn cancel_rebuild<T>(&mut self, timers: &mut Timers<T>) {
        self.debouncer.cancel(timers);
    }

    pub fn rebuild_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Put the active marker on `active`'s link and item, and nowhere else
    pub fn mark_active<D: Document + ?Sized>(&self, doc: &mut D, active: Option<&str>, class: &str) {
        for entry in &self.entries {
            let is_active = Some(entry.anchor_id.as_str()) == active;
            for node in [entry.link, entry.item] {
                if is_active {
                    doc.add_class(node, class);
                } else if doc.has_class(node, class) {
                    doc.remove_class(node, class);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{AnchorRegistry, MemoryDocument};

    fn page(ids: &[&str]) -> (MemoryDocument, NodeId) {
        let mut doc = MemoryDocument::new(800.0);
        let body = doc.body();
        let container = doc.add_element(body, "div");
        doc.set_attribute(container, "class", "anchor-navigation");
        for (i, id) in ids.iter().enumerate() {
            doc.add_section(id, i as f32 * 500.0, 500.0);
        }
        (doc, container)
    }

    fn anchors(doc: &MemoryDocument, config: &Configuration) -> Vec<Anchor> {
        AnchorRegistry::new(config.anchor_selector.clone()).discover(doc)
    }

    fn link_targets(doc: &MemoryDocument) -> Vec<String> {
        doc.query_selector_all(&Selector::class("anchor-nav-link"))
            .into_iter()
            .filter_map(|n| doc.attribute(n, ATTR_ANCHOR_TARGET))
            .collect()
    }

    #[test]
    fn test_one_entry_per_visible_anchor_in_order() {
        let (mut doc, _) = page(&["intro", "features", "legal", "pricing"]);
        let legal = doc.get_element_by_id("legal").unwrap();
        doc.set_attribute(legal, "data-show-in-nav", "false");

        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let found = anchors(&doc, &config);
        let count = menu.rebuild(&mut doc, &found);

        assert_eq!(count, 3);
        assert_eq!(link_targets(&doc), ["intro", "features", "pricing"]);
        assert!(menu.entry("legal").is_none());
    }

    #[test]
    fn test_entry_markup() {
        let (mut doc, container) = page(&["shipping-info"]);
        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let found = anchors(&doc, &config);
        menu.rebuild(&mut doc, &found);

        let nav = doc.children(container)[0];
        assert_eq!(doc.tag_name(nav), Some("nav"));
        assert_eq!(doc.attribute(nav, "aria-label").as_deref(), Some("Page navigation"));

        let entry = &menu.entries()[0];
        assert_eq!(doc.attribute(entry.link, "href").as_deref(), Some("#shipping-info"));
        assert_eq!(
            doc.attribute(entry.link, "aria-label").as_deref(),
            Some("Go to shipping info")
        );
        let label = doc.children(entry.link)[0];
        assert_eq!(doc.text(label), Some("shipping info"));
        assert_eq!(doc.parent(entry.link), Some(entry.item));
    }

    #[test]
    fn test_rebuild_replaces_previous_entries() {
        let (mut doc, container) = page(&["intro", "pricing"]);
        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let found = anchors(&doc, &config);
        menu.rebuild(&mut doc, &found);
        let first_links: Vec<_> = menu.entries().iter().map(|e| e.link).collect();

        let found = anchors(&doc, &config);
        menu.rebuild(&mut doc, &found);
        assert_eq!(doc.children(container).len(), 1);
        assert_eq!(link_targets(&doc), ["intro", "pricing"]);
        assert!(first_links.iter().all(|&link| !doc.is_connected(link)));
    }

    #[test]
    fn test_no_visible_anchors_empties_container() {
        let (mut doc, container) = page(&["intro"]);
        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let found = anchors(&doc, &config);
        menu.rebuild(&mut doc, &found);
        assert_eq!(doc.children(container).len(), 1);

        assert_eq!(menu.rebuild(&mut doc, &[]), 0);
        assert!(doc.children(container).is_empty());
        assert!(menu.entries().is_empty());
    }

    #[test]
    fn test_missing_container_is_noop() {
        let mut doc = MemoryDocument::new(800.0);
        doc.add_section("intro", 0.0, 500.0);
        doc.take_mutations();

        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let found = anchors(&doc, &config);
        assert_eq!(menu.rebuild(&mut doc, &found), 0);
        assert!(menu.container().is_none());
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_rebuild_mutations_stay_inside_container() {
        let (mut doc, container) = page(&["intro", "pricing"]);
        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        doc.take_mutations();

        let found = anchors(&doc, &config);
        menu.rebuild(&mut doc, &found);
        let records = doc.take_mutations();
        assert!(!records.is_empty());
        assert!(records.iter().all(|m| menu.owns(&doc, m.target)));
        assert!(menu.owns(&doc, container));
    }

    #[test]
    fn test_mark_active_is_exclusive() {
        let (mut doc, _) = page(&["intro", "features", "pricing"]);
        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let found = anchors(&doc, &config);
        menu.rebuild(&mut doc, &found);

        menu.mark_active(&mut doc, Some("features"), "active-anchor");
        menu.mark_active(&mut doc, Some("pricing"), "active-anchor");

        let marked = doc.query_selector_all(&Selector::class("active-anchor"));
        let pricing = menu.entry("pricing").unwrap();
        assert_eq!(marked, vec![pricing.item, pricing.link]);

        menu.mark_active(&mut doc, None, "active-anchor");
        assert!(doc.query_selector_all(&Selector::class("active-anchor")).is_empty());
    }

    #[test]
    fn test_schedule_rebuild_debounces() {
        let config = Configuration::default();
        let mut menu = MenuBuilder::new(&config);
        let mut timers = Timers::new();
        let ms = Duration::from_millis;

        menu.schedule_rebuild(&mut timers, ms(0), "rebuild");
        menu.schedule_rebuild(&mut timers, ms(30), "rebuild");
        let last = menu.schedule_rebuild(&mut timers, ms(60), "rebuild");
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(ms(160)));

        let due = timers.take_due(ms(160));
        assert_eq!(due.len(), 1);
        assert!(menu.rebuild_fired(last));
        assert!(!menu.rebuild_pending());
    }
}
