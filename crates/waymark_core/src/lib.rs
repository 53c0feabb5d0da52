//! Waymark Core
//!
//! Foundational pieces of the Waymark in-page navigation engine:
//!
//! - **Configuration**: typed, validated options resolved from host attributes
//! - **Host seams**: `Document`/`Window` traits the engine is written against
//! - **Anchor Registry**: ordered discovery of navigable sections
//! - **Offset Resolution**: per-anchor, selector-measured and fixed offsets
//! - **Timers**: single-shot timers and the debounce primitive
//! - **Init Guard**: one engine instance per document
//! - **Memory Host**: an in-memory document for tests and simulation
//!
//! # Example
//!
//! ```rust
//! use waymark_core::{AnchorRegistry, ConfigResolver, MemoryDocument, ScrollOffsetResolver};
//!
//! let mut doc = MemoryDocument::new(800.0);
//! doc.add_section("intro", 0.0, 600.0);
//! doc.add_section("pricing", 600.0, 600.0);
//!
//! let config = ConfigResolver::new().resolve([("offset", "64")]);
//! let mut registry = AnchorRegistry::new(config.anchor_selector.clone());
//! registry.refresh(&doc);
//!
//! let pricing = registry.find("pricing").unwrap();
//! let y = ScrollOffsetResolver::new(&config).target_position(&doc, pricing);
//! assert_eq!(y, Some(536.0));
//! ```

pub mod anchor;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod guard;
pub mod memory;
pub mod offset;
pub mod selector;
pub mod timer;

pub use anchor::{display_name_from_id, Anchor, AnchorRegistry};
pub use config::{Alignment, ConfigResolver, Configuration, OffsetSpec};
pub use document::{Document, DocumentId, Host, NodeId, Rect, Viewport, Window};
pub use error::{ConfigError, RegistryError, SelectorError};
pub use events::{EventOutcome, HostEvent, Mutation, MutationKind, NavEvent};
pub use guard::InitGuard;
pub use memory::{LayoutBox, MemoryDocument};
pub use offset::ScrollOffsetResolver;
pub use selector::{AttributeOperator, Combinator, Selector, SelectorSubject, SelectorTree};
pub use timer::{debounce, Debouncer, TimerId, Timers};
