//! Smooth-scroll animator
//!
//! Drives the viewport from its current position to a target over a fixed
//! duration. The host supplies frames by calling [`ScrollAnimator::tick`] with
//! the frame timestamp while [`ScrollAnimator::is_running`] is true.
//!
//! At most one animation is in flight. Starting another supersedes it: the
//! superseded animation's completion token is dropped and never reported, so
//! exactly one completion is reported per animation that runs to the end.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use waymark_animation::{AnimationStart, FrameResult, ScrollAnimator};
//! use waymark_core::{MemoryDocument, Viewport};
//!
//! let mut doc = MemoryDocument::new(800.0);
//! doc.set_content_height(4000.0);
//!
//! let mut animator = ScrollAnimator::new();
//! let start = animator.animate_to(&mut doc, 1000.0, 300, Duration::ZERO, "pricing");
//! assert!(matches!(start, AnimationStart::Running));
//!
//! let done = animator.tick(&mut doc, Duration::from_millis(300));
//! assert_eq!(done, FrameResult::Completed { y: 1000.0, token: "pricing" });
//! assert_eq!(doc.scroll_y(), 1000.0);
//! ```

use std::time::Duration;

use tracing::{debug, trace};
use waymark_core::Viewport;

use crate::easing::Easing;

/// Outcome of starting an animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationStart<T> {
    /// Frames will follow; completion is reported by `tick`
    Running,
    /// Instant jump; the animation is already complete
    Completed(T),
}

/// Outcome of one animation frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameResult<T> {
    /// Nothing in flight
    Idle,
    /// Scroll position written for this frame
    Running { y: f32 },
    /// Final frame written
    Completed { y: f32, token: T },
}

#[derive(Debug)]
struct ActiveScroll<T> {
    start_y: f32,
    target_y: f32,
    started_at: Duration,
    duration: Duration,
    token: T,
}

/// Cancellable, time-based scroll animation carrying a completion token `T`
#[derive(Debug)]
pub struct ScrollAnimator<T> {
    active: Option<ActiveScroll<T>>,
    easing: Easing,
}

impl<T> Default for ScrollAnimator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScrollAnimator<T> {
    pub fn new() -> Self {
        Self::with_easing(Easing::default())
    }

    pub fn with_easing(easing: Easing) -> Self {
        Self {
            active: None,
            easing,
        }
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Destination of the in-flight animation
    pub fn target(&self) -> Option<f32> {
        self.active.as_ref().map(|a| a.target_y)
    }

    /// Start scrolling to `target_y`
    ///
    /// Jumps immediately when `duration_ms` is zero or the viewport prefers
    /// reduced motion. Any animation already in flight is cancelled.
    pub fn animate_to<V>(
        &mut self,
        viewport: &mut V,
        target_y: f32,
        duration_ms: u32,
        now: Duration,
        token: T,
    ) -> AnimationStart<T>
    where
        V: Viewport + ?Sized,
    {
        self.cancel();
        let target_y = target_y.max(0.0);

        if duration_ms == 0 || viewport.prefers_reduced_motion() {
            debug!(target_y, "instant scroll");
            viewport.scroll_to(target_y);
            return AnimationStart::Completed(token);
        }

        let start_y = viewport.scroll_y();
        debug!(start_y, target_y, duration_ms, "starting scroll animation");
        self.active = Some(ActiveScroll {
            start_y,
            target_y,
            started_at: now,
            duration: Duration::from_millis(duration_ms as u64),
            token,
        });
        AnimationStart::Running
    }

    /// Advance the in-flight animation to `now`
    pub fn tick<V>(&mut self, viewport: &mut V, now: Duration) -> FrameResult<T>
    where
        V: Viewport + ?Sized,
    {
        let Some(active) = &self.active else {
            return FrameResult::Idle;
        };

        let elapsed = now.saturating_sub(active.started_at);
        let progress = if active.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / active.duration.as_secs_f32()).min(1.0)
        };

        if progress >= 1.0 {
            let target_y = active.target_y;
            viewport.scroll_to(target_y);
            let finished = self.active.take().map(|a| a.token);
            trace!(target_y, "scroll animation complete");
            return match finished {
                Some(token) => FrameResult::Completed { y: target_y, token },
                None => FrameResult::Idle,
            };
        }

        let eased = self.easing.apply(progress);
        let y = active.start_y + (active.target_y - active.start_y) * eased;
        viewport.scroll_to(y);
        FrameResult::Running { y }
    }

    /// Stop scheduling frames; the completion is never reported
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                debug!(target_y = active.target_y, "scroll animation cancelled");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::MemoryDocument;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn tall_page() -> MemoryDocument {
        let mut doc = MemoryDocument::new(800.0);
        doc.set_content_height(5000.0);
        doc
    }

    #[test]
    fn test_zero_duration_jumps_and_completes() {
        let mut doc = tall_page();
        let mut animator = ScrollAnimator::new();
        let start = animator.animate_to(&mut doc, 1200.0, 0, ms(0), 7);
        assert_eq!(start, AnimationStart::Completed(7));
        assert_eq!(doc.scroll_y(), 1200.0);
        assert!(!animator.is_running());
        assert_eq!(animator.tick(&mut doc, ms(16)), FrameResult::Idle);
    }

    #[test]
    fn test_reduced_motion_jumps() {
        let mut doc = tall_page();
        doc.set_reduced_motion(true);
        let mut animator = ScrollAnimator::new();
        let start = animator.animate_to(&mut doc, 900.0, 600, ms(0), ());
        assert_eq!(start, AnimationStart::Completed(()));
        assert_eq!(doc.scroll_y(), 900.0);
    }

    #[test]
    fn test_negative_target_clamped() {
        let mut doc = tall_page();
        doc.scroll_to(300.0);
        let mut animator = ScrollAnimator::new();
        animator.animate_to(&mut doc, -50.0, 100, ms(0), ());
        assert_eq!(animator.target(), Some(0.0));
        animator.tick(&mut doc, ms(100));
        assert_eq!(doc.scroll_y(), 0.0);
    }

    #[test]
    fn test_frames_progress_monotonically() {
        let mut doc = tall_page();
        let mut animator = ScrollAnimator::new();
        animator.animate_to(&mut doc, 1000.0, 500, ms(0), "a");

        let mut previous = doc.scroll_y();
        let mut completed = Vec::new();
        for frame in 1..=40 {
            match animator.tick(&mut doc, ms(frame * 16)) {
                FrameResult::Running { y } => {
                    assert!(y >= previous);
                    assert!(y < 1000.0);
                    previous = y;
                }
                FrameResult::Completed { y, token } => {
                    assert_eq!(y, 1000.0);
                    completed.push(token);
                }
                FrameResult::Idle => {}
            }
        }
        assert_eq!(completed, ["a"]);
        assert_eq!(doc.scroll_y(), 1000.0);
    }

    #[test]
    fn test_midpoint_uses_easing() {
        let mut doc = tall_page();
        let mut animator = ScrollAnimator::with_easing(Easing::Linear);
        animator.animate_to(&mut doc, 1000.0, 400, ms(0), ());
        assert_eq!(animator.tick(&mut doc, ms(100)), FrameResult::Running { y: 250.0 });
    }

    #[test]
    fn test_superseded_animation_never_completes() {
        let mut doc = tall_page();
        let mut animator = ScrollAnimator::new();
        animator.animate_to(&mut doc, 2000.0, 600, ms(0), "a");
        animator.tick(&mut doc, ms(100));
        animator.animate_to(&mut doc, 500.0, 600, ms(120), "b");

        let mut completed = Vec::new();
        let mut t = 120;
        while animator.is_running() {
            t += 16;
            if let FrameResult::Completed { token, .. } = animator.tick(&mut doc, ms(t)) {
                completed.push(token);
            }
        }
        assert_eq!(completed, ["b"]);
        assert_eq!(doc.scroll_y(), 500.0);
    }

    #[test]
    fn test_instant_jump_supersedes_running() {
        let mut doc = tall_page();
        let mut animator = ScrollAnimator::new();
        animator.animate_to(&mut doc, 2000.0, 600, ms(0), "a");
        let start = animator.animate_to(&mut doc, 100.0, 0, ms(50), "b");
        assert_eq!(start, AnimationStart::Completed("b"));
        assert_eq!(animator.tick(&mut doc, ms(700)), FrameResult::Idle);
        assert_eq!(doc.scroll_y(), 100.0);
    }

    #[test]
    fn test_cancel() {
        let mut doc = tall_page();
        let mut animator = ScrollAnimator::new();
        animator.animate_to(&mut doc, 1000.0, 300, ms(0), ());
        assert!(animator.cancel());
        assert!(!animator.cancel());
        assert_eq!(animator.tick(&mut doc, ms(400)), FrameResult::Idle);
        assert_eq!(doc.scroll_y(), 0.0);
    }
}
