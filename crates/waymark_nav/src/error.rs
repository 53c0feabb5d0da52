//! Navigation errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("no anchor with id '{0}'")]
    UnknownAnchor(String),

    #[error("anchor '{0}' is not attached to the document")]
    Detached(String),

    #[error("navigation is not initialized")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, NavError>;
