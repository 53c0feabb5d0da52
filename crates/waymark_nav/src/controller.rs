//! Navigation controller
//!
//! Owns every component and routes host input to them. The host delivers:
//!
//! - [`HostEvent`]s through [`NavigationController::handle_event`]
//! - animation frames through [`NavigationController::on_frame`] while
//!   [`NavigationController::needs_frame`] is true
//! - timer callbacks through [`NavigationController::on_timers`] once
//!   [`NavigationController::next_deadline`] has passed
//!
//! All of it runs on the host's single event loop; the controller never
//! holds a reference to the document between calls.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use waymark_core::{Configuration, Document, EventOutcome, HostEvent, MemoryDocument};
//! use waymark_nav::NavigationController;
//!
//! let mut doc = MemoryDocument::new(800.0);
//! let body = doc.body();
//! let menu = doc.add_element(body, "div");
//! doc.set_attribute(menu, "class", "anchor-navigation");
//! doc.add_section("intro", 0.0, 900.0);
//! doc.add_section("pricing", 900.0, 900.0);
//!
//! let mut nav = NavigationController::install(&mut doc, Configuration::default(), Duration::ZERO)
//!     .expect("first install");
//! assert_eq!(nav.anchors().len(), 2);
//!
//! let link = nav.menu_entries()[1].link;
//! let outcome = nav.handle_event(&mut doc, &HostEvent::Click { target: link }, Duration::ZERO);
//! assert_eq!(outcome, EventOutcome::PreventDefault);
//! assert!(nav.needs_frame());
//! ```

use std::time::Duration;

use tracing::{debug, info, trace};
use url::Url;
use waymark_animation::{AnimationStart, FrameResult, ScrollAnimator};
use waymark_core::anchor::{ATTR_ANCHOR_NAME, ATTR_SCROLL_OFFSET, ATTR_SHOW_IN_NAV};
use waymark_core::{
    Anchor, AnchorRegistry, Configuration, EventOutcome, Host, HostEvent, InitGuard, Mutation,
    MutationKind, NavEvent, NodeId, ScrollOffsetResolver, TimerId, Timers,
};

use crate::display::{AutoHide, ProgressBar};
use crate::error::{NavError, Result};
use crate::location::{
    deep_link_candidates, has_section_query, history_candidates, same_page_fragment,
    strip_section_query, with_fragment, without_fragment,
};
use crate::menu::{MenuBuilder, MenuEntry, ATTR_ANCHOR_TARGET};
use crate::tracker::ActiveSectionTracker;

/// Attributes whose change can alter the anchor set
const WATCHED_ATTRIBUTES: [&str; 5] = [
    "id",
    "class",
    ATTR_ANCHOR_NAME,
    ATTR_SHOW_IN_NAV,
    ATTR_SCROLL_OFFSET,
];

/// Deferred work scheduled on the controller's timers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTask {
    RebuildMenu,
    HideMenu,
    InitialLoad { anchor_id: String },
}

pub struct NavigationController {
    config: Configuration,
    registry: AnchorRegistry,
    menu: MenuBuilder,
    tracker: ActiveSectionTracker,
    animator: ScrollAnimator<String>,
    auto_hide: Option<AutoHide>,
    progress: Option<ProgressBar>,
    timers: Timers<NavTask>,
    initial_load: Option<TimerId>,
    guard: Option<InitGuard>,
}

impl NavigationController {
    pub fn new(config: Configuration) -> Self {
        Self {
            registry: AnchorRegistry::new(config.anchor_selector.clone()),
            menu: MenuBuilder::new(&config),
            tracker: ActiveSectionTracker::new(config.bottom_margin, config.visibility_threshold),
            animator: ScrollAnimator::new(),
            auto_hide: None,
            progress: None,
            timers: Timers::new(),
            initial_load: None,
            guard: None,
            config,
        }
    }

    /// Create and initialize a controller for `host`
    ///
    /// `None` if the document already has an active controller.
    pub fn install<H: Host + ?Sized>(host: &mut H, config: Configuration, now: Duration) -> Option<Self> {
        let mut controller = Self::new(config);
        controller.init(host, now).then_some(controller)
    }

    /// Run the one-time setup; repeated calls are no-ops
    ///
    /// Returns whether this controller is initialized afterwards. Fails when
    /// another controller already owns the document.
    pub fn init<H: Host + ?Sized>(&mut self, host: &mut H, now: Duration) -> bool {
        if self.guard.is_some() {
            return true;
        }
        let Some(guard) = InitGuard::acquire(host.document_id()) else {
            return false;
        };
        self.guard = Some(guard);

        self.registry.refresh(host);
        self.menu.rebuild(host, self.registry.anchors());
        self.tracker.set_targets(host, self.registry.anchors());

        if self.config.show_progress {
            self.progress = host
                .query_selector(&self.config.progress_selector)
                .map(ProgressBar::new);
            if let Some(progress) = &mut self.progress {
                progress.update(host);
            }
        }

        if self.config.auto_hide {
            if let Some(container) = self.menu.container() {
                let mut auto_hide =
                    AutoHide::new(container, self.config.auto_hide_delay_ms, &self.config.hidden_class);
                auto_hide.start(host, &mut self.timers, now, NavTask::HideMenu);
                self.auto_hide = Some(auto_hide);
            }
        }

        self.observe(host);
        self.schedule_initial_load(host, now);

        info!(
            anchors = self.registry.len(),
            menu = self.menu.entries().len(),
            "anchor navigation ready"
        );
        host.dispatch(&NavEvent::Ready);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.guard.is_some()
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn anchors(&self) -> &[Anchor] {
        self.registry.anchors()
    }

    pub fn menu_entries(&self) -> &[MenuEntry] {
        self.menu.entries()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.tracker.current()
    }

    pub fn is_menu_hidden(&self) -> bool {
        self.auto_hide.as_ref().is_some_and(AutoHide::is_hidden)
    }

    /// Whether the host should deliver animation frames
    pub fn needs_frame(&self) -> bool {
        self.animator.is_running()
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Route one host event
    pub fn handle_event<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        event: &HostEvent,
        now: Duration,
    ) -> EventOutcome {
        if !self.is_initialized() {
            return EventOutcome::PassThrough;
        }

        if event.is_activity() {
            if let Some(auto_hide) = &mut self.auto_hide {
                auto_hide.on_activity(host, &mut self.timers, now, NavTask::HideMenu);
            }
        }

        match event {
            HostEvent::Click { target } => self.on_click(host, *target, now),
            HostEvent::Scroll => {
                if let Some(progress) = &mut self.progress {
                    progress.update(host);
                }
                self.observe(host);
                EventOutcome::PassThrough
            }
            HostEvent::PointerMove | HostEvent::TouchStart => EventOutcome::PassThrough,
            HostEvent::PopState => {
                self.on_pop_state(host, now);
                EventOutcome::PassThrough
            }
            HostEvent::Mutations(records) => {
                self.on_mutations(host, records, now);
                EventOutcome::PassThrough
            }
        }
    }

    /// Advance the scroll animation by one frame
    pub fn on_frame<H: Host + ?Sized>(&mut self, host: &mut H, now: Duration) {
        if !self.is_initialized() {
            return;
        }
        match self.animator.tick(host, now) {
            FrameResult::Completed { token, .. } => self.complete_navigation(host, token),
            FrameResult::Running { y } => trace!(y, "scroll frame"),
            FrameResult::Idle => {}
        }
        self.observe(host);
    }

    /// Fire every timer due at `now`
    pub fn on_timers<H: Host + ?Sized>(&mut self, host: &mut H, now: Duration) {
        for (id, task) in self.timers.take_due(now) {
            match task {
                NavTask::RebuildMenu => {
                    if self.menu.rebuild_fired(id) {
                        self.resync(host);
                    }
                }
                NavTask::HideMenu => {
                    if let Some(auto_hide) = &mut self.auto_hide {
                        auto_hide.on_timer(host, id);
                    }
                }
                NavTask::InitialLoad { anchor_id } => {
                    if self.initial_load == Some(id) {
                        self.initial_load = None;
                        self.finish_initial_load(host, &anchor_id, now);
                    }
                }
            }
        }
    }

    /// Scroll to `anchor_id` without touching the URL
    ///
    /// Returns `false` if the id is unknown or the controller is not active.
    pub fn scroll_to<H: Host + ?Sized>(&mut self, host: &mut H, anchor_id: &str, now: Duration) -> bool {
        match self.navigate(host, anchor_id, now) {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "scroll_to ignored");
                false
            }
        }
    }

    /// Rediscover anchors and rebuild the menu now
    pub fn refresh<H: Host + ?Sized>(&mut self, host: &mut H) {
        if !self.is_initialized() {
            return;
        }
        self.menu.cancel_rebuild(&mut self.timers);
        self.resync(host);
    }

    /// Stop everything and release the document
    ///
    /// Afterwards no timers are pending and no frames are needed; a new
    /// controller may be installed on the same document.
    pub fn teardown(&mut self) {
        self.animator.cancel();
        self.menu.cancel_rebuild(&mut self.timers);
        if let Some(auto_hide) = &mut self.auto_hide {
            auto_hide.stop(&mut self.timers);
        }
        self.auto_hide = None;
        self.progress = None;
        self.initial_load = None;
        self.timers.clear();
        self.tracker.clear_targets();
        if self.guard.take().is_some() {
            debug!("anchor navigation torn down");
        }
    }

    fn navigate<H: Host + ?Sized>(&mut self, host: &mut H, anchor_id: &str, now: Duration) -> Result<()> {
        if !self.is_initialized() {
            return Err(NavError::NotInitialized);
        }
        let anchor = self
            .registry
            .find(anchor_id)
            .ok_or_else(|| NavError::UnknownAnchor(anchor_id.to_string()))?;
        let target_y = ScrollOffsetResolver::new(&self.config)
            .target_position(host, anchor)
            .ok_or_else(|| NavError::Detached(anchor_id.to_string()))?;

        debug!(anchor = anchor_id, target_y, "navigating");
        let start = self.animator.animate_to(
            host,
            target_y,
            self.config.duration_ms,
            now,
            anchor_id.to_string(),
        );
        if let AnimationStart::Completed(token) = start {
            self.complete_navigation(host, token);
        }
        Ok(())
    }

    fn complete_navigation<H: Host + ?Sized>(&mut self, host: &mut H, anchor_id: String) {
        if self.tracker.force_active(&anchor_id, host.scroll_y()).is_some() {
            self.menu
                .mark_active(host, self.tracker.current(), &self.config.active_class);
        }
        debug!(anchor = %anchor_id, "navigation complete");
        host.dispatch(&NavEvent::Navigated { anchor_id });
    }

    fn observe<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.animator.is_running() {
            return;
        }
        let top_offset = ScrollOffsetResolver::new(&self.config).resolve(host, None);
        if let Some(transition) = self.tracker.observe(host, top_offset) {
            debug!(
                previous = ?transition.previous,
                current = %transition.current,
                "active section changed"
            );
            self.menu
                .mark_active(host, Some(&transition.current), &self.config.active_class);
        }
    }

    fn resync<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.registry.refresh(host);
        self.menu.rebuild(host, self.registry.anchors());
        self.tracker.set_targets(host, self.registry.anchors());
        self.menu
            .mark_active(host, self.tracker.current(), &self.config.active_class);
        self.observe(host);
    }

    fn on_click<H: Host + ?Sized>(&mut self, host: &mut H, target: NodeId, now: Duration) -> EventOutcome {
        let Some(link) = host.closest(target, &self.config.link_selector) else {
            return EventOutcome::PassThrough;
        };
        let location = host.location();
        let anchor_id = host.attribute(link, ATTR_ANCHOR_TARGET).or_else(|| {
            host.attribute(link, "href")
                .and_then(|href| same_page_fragment(&location, &href))
        });
        let Some(anchor_id) = anchor_id.filter(|id| self.registry.contains(id)) else {
            return EventOutcome::PassThrough;
        };

        if let Err(err) = self.navigate(host, &anchor_id, now) {
            debug!(%err, "link left to the browser");
            return EventOutcome::PassThrough;
        }

        if self.config.update_url {
            let url = with_fragment(&location, &anchor_id);
            if url != location {
                host.push_state(&url);
            }
        } else {
            replace_if_changed(host, &location, without_fragment(&location));
        }
        EventOutcome::PreventDefault
    }

    fn on_pop_state<H: Host + ?Sized>(&mut self, host: &mut H, now: Duration) {
        let location = host.location();
        let target = history_candidates(&location, self.config.allow_query)
            .into_iter()
            .find(|id| self.registry.contains(id));
        if let Some(anchor_id) = target {
            trace!(anchor = %anchor_id, "history navigation");
            let _ = self.navigate(host, &anchor_id, now);
        }
    }

    fn on_mutations<H: Host + ?Sized>(&mut self, host: &mut H, records: &[Mutation], now: Duration) {
        let relevant = records.iter().any(|m| {
            if !host.is_connected(m.target) || self.menu.owns(host, m.target) {
                return false;
            }
            match &m.kind {
                MutationKind::ChildList => true,
                MutationKind::Attribute(name) => WATCHED_ATTRIBUTES.contains(&name.as_str()),
            }
        });
        if relevant {
            trace!(records = records.len(), "document changed, menu rebuild scheduled");
            self.menu
                .schedule_rebuild(&mut self.timers, now, NavTask::RebuildMenu);
        }
    }

    fn schedule_initial_load<H: Host + ?Sized>(&mut self, host: &mut H, now: Duration) {
        let location = host.location();
        let target = deep_link_candidates(&location, self.config.allow_query)
            .into_iter()
            .find(|id| self.registry.contains(id));

        match target {
            Some(anchor_id) => {
                debug!(anchor = %anchor_id, "deep link on load");
                let delay = Duration::from_millis(self.config.initial_load_delay_ms as u64);
                self.initial_load =
                    Some(self.timers.schedule(now, delay, NavTask::InitialLoad { anchor_id }));
            }
            None if self.config.allow_query && has_section_query(&location) => {
                debug!("deep link names no known anchor");
                replace_if_changed(host, &location, strip_section_query(&location));
            }
            None => {}
        }
    }

    fn finish_initial_load<H: Host + ?Sized>(&mut self, host: &mut H, anchor_id: &str, now: Duration) {
        if let Err(err) = self.navigate(host, anchor_id, now) {
            debug!(%err, "deep link target vanished");
        }

        let location = host.location();
        let mut url = if self.config.allow_query {
            strip_section_query(&location)
        } else {
            location.clone()
        };
        url = if self.config.update_url {
            with_fragment(&url, anchor_id)
        } else {
            without_fragment(&url)
        };
        replace_if_changed(host, &location, url);
    }
}

fn replace_if_changed<H: Host + ?Sized>(host: &mut H, current: &Url, next: Url) {
    if &next != current {
        host.replace_state(&next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{ConfigResolver, Document, MemoryDocument, Viewport, Window};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn page(url: &str) -> MemoryDocument {
        let mut doc = MemoryDocument::with_url(800.0, url).unwrap();
        let body = doc.body();
        let menu = doc.add_element(body, "div");
        doc.set_attribute(menu, "class", "anchor-navigation");
        doc.add_section("intro", 0.0, 600.0);
        doc.add_section("features", 600.0, 600.0);
        doc.add_section("pricing", 1200.0, 600.0);
        doc.set_content_height(3000.0);
        doc
    }

    fn instant() -> Configuration {
        ConfigResolver::new().resolve([("duration", "0")])
    }

    #[test]
    fn test_install_dispatches_ready_and_builds_menu() {
        let mut doc = page("https://shop.example/");
        let nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        assert_eq!(doc.events(), [NavEvent::Ready]);
        assert_eq!(nav.menu_entries().len(), 3);
        assert_eq!(nav.active_id(), Some("intro"));
    }

    #[test]
    fn test_second_install_is_refused() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        assert!(NavigationController::install(&mut doc, instant(), ms(0)).is_none());
        assert!(nav.init(&mut doc, ms(0)));
        assert_eq!(doc.events(), [NavEvent::Ready]);
    }

    #[test]
    fn test_scroll_to_unknown_is_noop() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        doc.take_events();
        assert!(!nav.scroll_to(&mut doc, "missing", ms(0)));
        assert_eq!(doc.scroll_y(), 0.0);
        assert!(doc.events().is_empty());
    }

    #[test]
    fn test_scroll_to_before_init_fails() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::new(instant());
        assert!(!nav.scroll_to(&mut doc, "pricing", ms(0)));
        assert_eq!(
            nav.navigate(&mut doc, "pricing", ms(0)),
            Err(NavError::NotInitialized)
        );
    }

    #[test]
    fn test_instant_scroll_marks_destination() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        assert!(nav.scroll_to(&mut doc, "pricing", ms(0)));
        assert_eq!(doc.scroll_y(), 1120.0);
        assert_eq!(nav.active_id(), Some("pricing"));
        assert!(doc.has_class(nav.menu_entries()[2].link, "active-anchor"));
        assert_eq!(
            doc.events().last(),
            Some(&NavEvent::Navigated {
                anchor_id: "pricing".into()
            })
        );
    }

    #[test]
    fn test_unrelated_click_passes_through() {
        let mut doc = page("https://shop.example/");
        let body = doc.body();
        let link = doc.add_element(body, "a");
        doc.set_attribute(link, "href", "/cart");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();

        let outcome = nav.handle_event(&mut doc, &HostEvent::Click { target: link }, ms(0));
        assert_eq!(outcome, EventOutcome::PassThrough);
        assert_eq!(doc.scroll_y(), 0.0);
    }

    #[test]
    fn test_click_on_unknown_fragment_passes_through() {
        let mut doc = page("https://shop.example/");
        let body = doc.body();
        let link = doc.add_element(body, "a");
        doc.set_attribute(link, "href", "#reviews");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();

        let outcome = nav.handle_event(&mut doc, &HostEvent::Click { target: link }, ms(0));
        assert_eq!(outcome, EventOutcome::PassThrough);
    }

    #[test]
    fn test_click_inside_link_uses_enclosing_anchor() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        let link = nav.menu_entries()[1].link;
        let label = doc.children(link)[0];

        let outcome = nav.handle_event(&mut doc, &HostEvent::Click { target: label }, ms(0));
        assert!(outcome.is_prevented());
        assert_eq!(doc.scroll_y(), 520.0);
    }

    #[test]
    fn test_update_url_pushes_history_entry() {
        let mut doc = page("https://shop.example/");
        let config = ConfigResolver::new().resolve([("duration", "0"), ("update-url", "true")]);
        let mut nav = NavigationController::install(&mut doc, config, ms(0)).unwrap();
        let link = nav.menu_entries()[2].link;

        nav.handle_event(&mut doc, &HostEvent::Click { target: link }, ms(0));
        assert_eq!(doc.location().as_str(), "https://shop.example/#pricing");
        assert_eq!(doc.history_len(), 2);
    }

    #[test]
    fn test_history_navigation_prefers_hash() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        let both = Url::parse("https://shop.example/?sec=features#pricing").unwrap();
        let home = Url::parse("https://shop.example/").unwrap();
        doc.push_state(&both);
        doc.push_state(&home);

        doc.back();
        nav.handle_event(&mut doc, &HostEvent::PopState, ms(0));
        assert_eq!(doc.scroll_y(), 1120.0);
        assert_eq!(nav.active_id(), Some("pricing"));
        assert_eq!(doc.history_len(), 3);
    }

    #[test]
    fn test_menu_mutations_are_ignored() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        let records = doc.take_mutations();
        assert!(!records.is_empty());

        let menu_only: Vec<_> = records
            .into_iter()
            .filter(|m| nav.menu.owns(&doc, m.target))
            .collect();
        nav.handle_event(&mut doc, &HostEvent::Mutations(menu_only), ms(0));
        assert!(!nav.menu.rebuild_pending());
    }

    #[test]
    fn test_style_mutation_is_ignored() {
        let mut doc = page("https://shop.example/");
        let mut nav = NavigationController::install(&mut doc, instant(), ms(0)).unwrap();
        let intro = doc.get_element_by_id("intro").unwrap();
        let records = vec![Mutation::attribute(intro, "style")];
        nav.handle_event(&mut doc, &HostEvent::Mutations(records), ms(0));
        assert!(!nav.menu.rebuild_pending());

        let records = vec![Mutation::attribute(intro, ATTR_ANCHOR_NAME)];
        nav.handle_event(&mut doc, &HostEvent::Mutations(records), ms(0));
        assert!(nav.menu.rebuild_pending());
    }

    #[test]
    fn test_teardown_releases_document() {
        let mut doc = page("https://shop.example/");
        let config = ConfigResolver::new().resolve([("auto-hide", "true")]);
        let mut nav = NavigationController::install(&mut doc, config, ms(0)).unwrap();
        nav.scroll_to(&mut doc, "pricing", ms(0));
        assert!(nav.needs_frame());
        assert!(nav.pending_timers() > 0);

        nav.teardown();
        assert!(!nav.needs_frame());
        assert_eq!(nav.pending_timers(), 0);
        assert!(!nav.is_initialized());
        assert!(NavigationController::install(&mut doc, instant(), ms(0)).is_some());
    }
}
