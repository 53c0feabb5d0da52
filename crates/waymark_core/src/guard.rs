//! Per-document initialization guard
//!
//! Loading the engine twice on the same page must be a no-op the second time.
//! The guard registers the document in a process-wide set and removes it again
//! on drop, so teardown (or dropping the controller) makes the document
//! available to a fresh instance.

use std::sync::{Mutex, OnceLock};

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::document::DocumentId;

fn installed() -> &'static Mutex<FxHashSet<DocumentId>> {
    static INSTALLED: OnceLock<Mutex<FxHashSet<DocumentId>>> = OnceLock::new();
    INSTALLED.get_or_init(|| Mutex::new(FxHashSet::default()))
}

/// Proof that this instance owns the document's initialization slot
#[derive(Debug)]
pub struct InitGuard {
    document: DocumentId,
}

impl InitGuard {
    /// Claim the document; `None` if another instance already holds it
    pub fn acquire(document: DocumentId) -> Option<Self> {
        let mut set = installed().lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(document) {
            debug!(?document, "navigation already initialized for document");
            return None;
        }
        Some(Self { document })
    }

    pub fn is_installed(document: DocumentId) -> bool {
        installed()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&document)
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        installed()
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.document);
    }
}
