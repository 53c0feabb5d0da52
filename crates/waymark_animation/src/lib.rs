//! Waymark Animation
//!
//! Timed scroll animation for the navigation engine.
//!
//! # Features
//!
//! - **Easing Curves**: monotonic ease-in-out and ease-out curves
//! - **Smooth Scroll**: frame-driven animation toward a target position
//! - **Supersession**: starting a new scroll cancels the one in flight
//! - **Reduced Motion**: instant jumps when the user asks for less motion

pub mod easing;
pub mod scroll;

pub use easing::Easing;
pub use scroll::{AnimationStart, FrameResult, ScrollAnimator};
