//! Waymark Navigation
//!
//! The in-page navigation engine: builds a section menu from the page's
//! anchors, smooth-scrolls to a section on click or deep link, and keeps the
//! menu's active marker in sync with what the reader is looking at.
//!
//! # Features
//!
//! - **Menu Synthesis**: one accessible link per menu-visible anchor
//! - **Link Interception**: same-page fragment links scroll instead of jumping
//! - **Deep Links**: `?sec=` / `?section=` / `#id` honored on load and on history navigation
//! - **Active Tracking**: topmost section in the observed region is marked active
//! - **Auto-hide & Progress**: optional idle-hiding menu and reading-progress bar
//! - **Live Refresh**: debounced menu rebuild when the document changes
//!
//! The controller is host-driven. Everything it does happens inside a call
//! from the host: an event, an animation frame, or a timer callback.

pub mod controller;
pub mod display;
pub mod driver;
pub mod error;
pub mod location;
pub mod menu;
pub mod tracker;

pub use controller::{NavTask, NavigationController};
pub use display::{progress_percent, AutoHide, ProgressBar};
pub use driver::FrameDriver;
pub use error::{NavError, Result};
pub use menu::{MenuBuilder, MenuEntry, ATTR_ANCHOR_TARGET};
pub use tracker::{ActiveSectionTracker, Transition};
