//! Scroll offset resolution
//!
//! Precedence for the pixel offset of a target:
//!
//! 1. the anchor's own non-zero `data-scroll-offset`
//! 2. the live height of the configured offset element (selector offsets)
//! 3. the configured pixel offset
//! 4. zero
//!
//! Selector offsets are re-measured on every call; sticky headers collapse and
//! grow between page states.

use tracing::trace;

use crate::anchor::Anchor;
use crate::config::{Alignment, Configuration, OffsetSpec};
use crate::document::{Document, Viewport};

/// Computes offsets and final scroll positions for anchors
#[derive(Clone, Copy, Debug)]
pub struct ScrollOffsetResolver<'a> {
    config: &'a Configuration,
}

impl<'a> ScrollOffsetResolver<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Effective top offset in pixels for `target`
    pub fn resolve<D: Document + ?Sized>(&self, doc: &D, target: Option<&Anchor>) -> f32 {
        if let Some(px) = target.and_then(Anchor::effective_override) {
            return px as f32;
        }
        match &self.config.offset {
            OffsetSpec::Selector(selector) => {
                let height = doc
                    .query_selector(selector)
                    .and_then(|node| doc.bounding_rect(node))
                    .map_or(0.0, |rect| rect.height.max(0.0));
                trace!(%selector, height, "measured offset element");
                height
            }
            OffsetSpec::Pixels(px) => *px as f32,
        }
    }

    /// Absolute scroll position that brings `anchor` into place
    ///
    /// `None` when the anchor's element has no layout box (detached).
    pub fn target_position<H>(&self, host: &H, anchor: &Anchor) -> Option<f32>
    where
        H: Document + Viewport + ?Sized,
    {
        let rect = host.bounding_rect(anchor.element)?;
        let absolute_top = rect.top + host.scroll_y();
        let offset = self.resolve(host, Some(anchor));

        let y = match self.config.alignment {
            Alignment::Start => absolute_top - offset,
            Alignment::Center => {
                let region = (host.viewport_height() - offset).max(0.0);
                absolute_top + rect.height / 2.0 - offset - region / 2.0
            }
        };
        Some(y.max(0.0))
    }
}
