//! Simulated host event loop
//!
//! Stands in for the browser's frame and timer callbacks: advances a clock
//! at a fixed frame interval, fires due timers, delivers animation frames,
//! and reports a scroll event whenever the viewport moved.

use std::time::Duration;

use tracing::trace;
use waymark_core::{EventOutcome, Host, HostEvent};

use crate::controller::NavigationController;

#[derive(Debug, Clone, Copy)]
pub struct FrameDriver {
    now: Duration,
    frame_interval: Duration,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::with_fps(60)
    }
}

impl FrameDriver {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            frame_interval: frame_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn with_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Advance one frame interval
    pub fn step<H: Host + ?Sized>(&mut self, controller: &mut NavigationController, host: &mut H) {
        self.now += self.frame_interval;

        if controller.next_deadline().is_some_and(|d| d <= self.now) {
            controller.on_timers(host, self.now);
        }

        if controller.needs_frame() {
            let before = host.scroll_y();
            controller.on_frame(host, self.now);
            if host.scroll_y() != before {
                controller.handle_event(host, &HostEvent::Scroll, self.now);
            }
        }
    }

    /// Run frames until `duration` has elapsed
    pub fn advance<H: Host + ?Sized>(
        &mut self,
        controller: &mut NavigationController,
        host: &mut H,
        duration: Duration,
    ) {
        let until = self.now + duration;
        while self.now < until {
            self.step(controller, host);
        }
    }

    /// Run frames until no animation or timer is pending, or `limit` elapses
    ///
    /// Returns whether the controller went idle.
    pub fn settle<H: Host + ?Sized>(
        &mut self,
        controller: &mut NavigationController,
        host: &mut H,
        limit: Duration,
    ) -> bool {
        let until = self.now + limit;
        while self.now < until {
            if !controller.needs_frame() && controller.next_deadline().is_none() {
                trace!(now = ?self.now, "settled");
                return true;
            }
            self.step(controller, host);
        }
        !controller.needs_frame() && controller.next_deadline().is_none()
    }

    /// Deliver `event` at the current time
    pub fn dispatch<H: Host + ?Sized>(
        &mut self,
        controller: &mut NavigationController,
        host: &mut H,
        event: HostEvent,
    ) -> EventOutcome {
        controller.handle_event(host, &event, self.now)
    }
}
