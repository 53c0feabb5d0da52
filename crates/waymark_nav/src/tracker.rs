//! Active-section tracking
//!
//! Each observation batch measures the observed anchors against a region of
//! the viewport: from the top offset down to `bottom_margin` of the viewport
//! height above the bottom edge. Of the anchors intersecting the region, the
//! topmost becomes active. When none intersect, the previous active anchor is
//! kept.
//!
//! A completed navigation forces its destination active and pins it to the
//! scroll position the navigation landed at. While the viewport stays there,
//! a batch whose verdict contradicts the forced anchor is discarded; centered
//! or clamped destinations are rarely the topmost intersecting section. The
//! first batch measured after the viewport moves releases the pin.

use tracing::trace;
use waymark_core::{Anchor, Document, NodeId, Viewport};

/// Change of active anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous: Option<String>,
    pub current: String,
}

#[derive(Debug, Clone)]
struct ObservedTarget {
    id: String,
    element: NodeId,
}

/// Scroll distance within which the viewport still counts as parked on a
/// navigation's landing position
const LANDING_TOLERANCE: f32 = 0.5;

#[derive(Debug, Clone)]
struct ForcedActive {
    id: String,
    landing_y: f32,
}

#[derive(Debug, Clone)]
pub struct ActiveSectionTracker {
    targets: Vec<ObservedTarget>,
    current: Option<String>,
    forced: Option<ForcedActive>,
    bottom_margin: f32,
    threshold: f32,
}

impl ActiveSectionTracker {
    pub fn new(bottom_margin: f32, threshold: f32) -> Self {
        Self {
            targets: Vec::new(),
            current: None,
            forced: None,
            bottom_margin: bottom_margin.clamp(0.0, 1.0),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Observe the menu-visible, connected anchors (replaces prior targets)
    pub fn set_targets<D: Document + ?Sized>(&mut self, doc: &D, anchors: &[Anchor]) {
        self.targets = anchors
            .iter()
            .filter(|a| a.visible_in_menu && doc.is_connected(a.element))
            .map(|a| ObservedTarget {
                id: a.id.clone(),
                element: a.element,
            })
            .collect();
        trace!(targets = self.targets.len(), "observing anchors");
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.forced = None;
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.id.as_str())
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The anchor a batch measured now would select, without applying it
    pub fn select<H>(&self, host: &H, top_offset: f32) -> Option<String>
    where
        H: Document + Viewport + ?Sized,
    {
        let region_top = top_offset.max(0.0);
        let region_bottom = host.viewport_height() * (1.0 - self.bottom_margin);
        let region_height = region_bottom - region_top;
        if region_height <= 0.0 {
            return None;
        }

        self.targets
            .iter()
            .filter_map(|target| {
                let rect = host.bounding_rect(target.element)?;
                let visible = rect.bottom().min(region_bottom) - rect.top.max(region_top);
                let intersecting = if rect.height <= 0.0 {
                    rect.top >= region_top && rect.top <= region_bottom
                } else {
                    visible > 0.0
                        && (visible / rect.height >= self.threshold
                            || visible >= region_height * self.threshold)
                };
                intersecting.then_some((target, rect.top))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(target, _)| target.id.clone())
    }

    /// Run one observation batch against the current viewport
    pub fn observe<H>(&mut self, host: &H, top_offset: f32) -> Option<Transition>
    where
        H: Document + Viewport + ?Sized,
    {
        let moved = self
            .forced
            .as_ref()
            .is_some_and(|f| (host.scroll_y() - f.landing_y).abs() > LANDING_TOLERANCE);
        if moved {
            trace!("viewport left the navigation target");
            self.forced = None;
        }

        let verdict = self.select(host, top_offset)?;

        if let Some(forced) = &self.forced {
            if forced.id != verdict {
                trace!(forced = %forced.id, %verdict, "discarding stale observation");
                return None;
            }
        }

        self.transition_to(verdict)
    }

    /// Make `id` active regardless of geometry until the viewport leaves
    /// `landing_y`
    pub fn force_active(&mut self, id: &str, landing_y: f32) -> Option<Transition> {
        self.forced = Some(ForcedActive {
            id: id.to_string(),
            landing_y,
        });
        self.transition_to(id.to_string())
    }

    fn transition_to(&mut self, id: String) -> Option<Transition> {
        if self.current.as_deref() == Some(id.as_str()) {
            return None;
        }
        let previous = self.current.replace(id.clone());
        trace!(?previous, current = %id, "active anchor changed");
        Some(Transition {
            previous,
            current: id,
        })
    }
}
