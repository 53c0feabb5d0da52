//! Event types
//!
//! Incoming [`HostEvent`]s are the independent callback streams of the page
//! (clicks, scrolling, pointer/touch activity, history navigation, mutation
//! batches) as typed values. Outgoing [`NavEvent`]s are what other in-page
//! scripts subscribe to.

use serde::Serialize;

use crate::document::NodeId;

/// Event emitted by the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NavEvent {
    /// Initialization finished
    Ready,
    /// A navigation reached its destination
    Navigated { anchor_id: String },
}

impl NavEvent {
    pub const READY: &'static str = "anchor-navigation:ready";
    pub const NAVIGATED: &'static str = "anchor-navigation:navigated";

    /// DOM event name for this event
    pub fn name(&self) -> &'static str {
        match self {
            NavEvent::Ready => Self::READY,
            NavEvent::Navigated { .. } => Self::NAVIGATED,
        }
    }
}

/// What changed in a single mutation record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were inserted or removed
    ChildList,
    /// The named attribute changed
    Attribute(String),
}

/// A structural change reported by the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub target: NodeId,
    pub kind: MutationKind,
}

impl Mutation {
    pub fn child_list(target: NodeId) -> Self {
        Self {
            target,
            kind: MutationKind::ChildList,
        }
    }

    pub fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            target,
            kind: MutationKind::Attribute(name.to_string()),
        }
    }
}

/// Input delivered to the engine by the host
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// Primary click on an element
    Click { target: NodeId },
    /// The window scrolled
    Scroll,
    PointerMove,
    TouchStart,
    /// Browser back/forward changed the location
    PopState,
    /// A batch of mutation records
    Mutations(Vec<Mutation>),
}

impl HostEvent {
    /// Whether this counts as user activity for auto-hide
    pub fn is_activity(&self) -> bool {
        matches!(
            self,
            HostEvent::Scroll | HostEvent::PointerMove | HostEvent::TouchStart
        )
    }
}

/// How the host should treat the original event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The engine handled it; suppress the default action
    PreventDefault,
    /// Let the browser's default behavior run
    PassThrough,
}

impl EventOutcome {
    pub fn is_prevented(&self) -> bool {
        matches!(self, EventOutcome::PreventDefault)
    }
}
