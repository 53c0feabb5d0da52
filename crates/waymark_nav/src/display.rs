//! Auxiliary displays: menu auto-hide and the reading-progress bar

use std::time::Duration;

use tracing::trace;
use waymark_core::{Document, NodeId, TimerId, Timers, Viewport};

/// Hides the menu container after a period without user activity
#[derive(Debug, Clone)]
pub struct AutoHide {
    container: NodeId,
    delay: Duration,
    hidden_class: String,
    pending: Option<TimerId>,
    hidden: bool,
}

impl AutoHide {
    pub fn new(container: NodeId, delay_ms: u32, hidden_class: impl Into<String>) -> Self {
        Self {
            container,
            delay: Duration::from_millis(delay_ms as u64),
            hidden_class: hidden_class.into(),
            pending: None,
            hidden: false,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Arm the idle timer; the menu starts visible
    pub fn start<D, T>(&mut self, doc: &mut D, timers: &mut Timers<T>, now: Duration, task: T)
    where
        D: Document + ?Sized,
    {
        self.on_activity(doc, timers, now, task);
    }

    /// Show the menu and restart the idle countdown
    pub fn on_activity<D, T>(&mut self, doc: &mut D, timers: &mut Timers<T>, now: Duration, task: T)
    where
        D: Document + ?Sized,
    {
        if self.hidden {
            doc.remove_class(self.container, &self.hidden_class);
            self.hidden = false;
            trace!("menu shown");
        }
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
        self.pending = Some(timers.schedule(now, self.delay, task));
    }

    /// Handle a fired timer; hides the menu if it was this instance's countdown
    pub fn on_timer<D: Document + ?Sized>(&mut self, doc: &mut D, id: TimerId) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        self.pending = None;
        doc.add_class(self.container, &self.hidden_class);
        self.hidden = true;
        trace!("menu hidden after inactivity");
        true
    }

    pub fn stop<T>(&mut self, timers: &mut Timers<T>) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
    }
}

/// Share of the scrollable range already scrolled, in `[0, 100]`
///
/// A page that cannot scroll reports 0.
pub fn progress_percent(scroll_y: f32, scroll_height: f32, viewport_height: f32) -> f32 {
    let range = scroll_height - viewport_height;
    if range <= 0.0 {
        return 0.0;
    }
    (100.0 * scroll_y / range.max(1.0)).clamp(0.0, 100.0)
}

/// Width-driven progress indicator
#[derive(Debug, Clone)]
pub struct ProgressBar {
    bar: NodeId,
    last: Option<f32>,
}

impl ProgressBar {
    pub fn new(bar: NodeId) -> Self {
        Self { bar, last: None }
    }

    pub fn element(&self) -> NodeId {
        self.bar
    }

    /// Last percentage written
    pub fn value(&self) -> Option<f32> {
        self.last
    }

    /// Recompute from the current scroll position and write the bar's width
    pub fn update<H>(&mut self, host: &mut H) -> f32
    where
        H: Document + Viewport + ?Sized,
    {
        let pct = progress_percent(host.scroll_y(), host.scroll_height(), host.viewport_height());
        if self.last != Some(pct) {
            host.set_style(self.bar, "width", &format!("{pct}%"));
            self.last = Some(pct);
        }
        pct
    }
}
