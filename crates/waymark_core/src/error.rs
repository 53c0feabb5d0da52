//! Error types
//!
//! None of these are fatal for the page. Configuration errors fall back to
//! defaults, registry errors drop the offending anchor, and navigation errors
//! turn into a no-op at the public API.

use thiserror::Error;

/// A configuration attribute that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("attribute `{name}` is not an integer: {value:?}")]
    InvalidInteger { name: String, value: String },

    #[error("attribute `{name}` is not a boolean: {value:?}")]
    InvalidBoolean { name: String, value: String },

    #[error("attribute `{name}` has unknown alignment {value:?} (expected `start` or `center`)")]
    InvalidAlignment { name: String, value: String },

    #[error("attribute `{name}` holds an unusable selector: {source}")]
    InvalidSelector {
        name: String,
        #[source]
        source: SelectorError,
    },
}

/// A selector string that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character {found:?} at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("selector ends early")]
    UnexpectedEnd,
}

/// Problems with the set of anchors found in the document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("anchor id `{id}` appears {count} times")]
    DuplicateId { id: String, count: usize },
}
