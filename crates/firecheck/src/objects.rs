//! Transient references to generated documents.
//!
//! A [`DocumentRef`] behaves like a `blob:` URL: it names a document held in
//! memory by an [`ObjectUrls`] registry, stays valid until revoked or until
//! the process exits, and is never written to storage.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::report::DocumentBlob;

/// URL scheme prefix for every reference handed out.
const REF_PREFIX: &str = "blob:firecheck/";

/// Opaque handle to a document living in an [`ObjectUrls`] registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Wrap an existing reference string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// The reference as a URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live document references for the current process.
#[derive(Debug, Default)]
pub struct ObjectUrls {
    next: AtomicU64,
    live: RwLock<HashMap<DocumentRef, Arc<DocumentBlob>>>,
}

impl ObjectUrls {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and hand out a fresh reference to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn create(&self, blob: Arc<DocumentBlob>) -> Result<DocumentRef> {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        let reference = DocumentRef(format!("{REF_PREFIX}{n}"));
        self.live
            .write()
            .map_err(|_| Error::internal("object url registry poisoned"))?
            .insert(reference.clone(), blob);
        trace!("Created {}", reference);
        Ok(reference)
    }

    /// Re-materialize the document behind a reference.
    ///
    /// Returns `None` for revoked or foreign references.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn fetch(&self, reference: &DocumentRef) -> Result<Option<Arc<DocumentBlob>>> {
        let live = self
            .live
            .read()
            .map_err(|_| Error::internal("object url registry poisoned"))?;
        Ok(live.get(reference).cloned())
    }

    /// Release a reference. Revoking twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry lock is poisoned.
    pub fn revoke(&self, reference: &DocumentRef) -> Result<bool> {
        let removed = self
            .live
            .write()
            .map_err(|_| Error::internal("object url registry poisoned"))?
            .remove(reference)
            .is_some();
        if removed {
            trace!("Revoked {}", reference);
        }
        Ok(removed)
    }

    /// Number of live references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.read().map(|live| live.len()).unwrap_or(0)
    }

    /// Whether no references are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
