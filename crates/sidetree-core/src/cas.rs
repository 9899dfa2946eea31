//! Content-addressed store (CAS) access for batch files.
//!
//! The resolver core is a read-only CAS consumer: every batch file is
//! addressed by CID, and the transport (IPFS or otherwise) is supplied by
//! the caller behind the [`ContentStore`] trait. The store is responsible
//! for gzip decompression and transport-level size caps; the bytes handed
//! to this crate are plain JSON.
//!
//! [`MemoryStore`] is an in-memory implementation for tests and local
//! pipelines.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;

/// Errors a content store can report on fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CasError {
    /// No object is stored under the requested CID.
    #[error("no content stored for CID {cid}")]
    NotFound {
        /// The CID that could not be resolved.
        cid: String,
    },

    /// The fetch did not complete within the caller's deadline.
    #[error("fetch of {cid} did not complete within {deadline:?}")]
    Timeout {
        /// The CID whose fetch timed out.
        cid: String,
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// Any other backend failure (transport, decompression, corruption).
    #[error("content store backend error: {message}")]
    Backend {
        /// Backend-supplied description.
        message: String,
    },
}

/// Read-only fetch interface over a content-addressed store.
///
/// Implementations must return fully decompressed bytes: batch files travel
/// as gzip-compressed JSON and the store owns the gunzip step. The core
/// never writes.
///
/// `deadline` bounds a single fetch; `None` means the implementation's own
/// default. A fetch that outlives its deadline reports
/// [`CasError::Timeout`], and implementations must not leave background
/// work running past it.
pub trait ContentStore: Send + Sync {
    /// Fetches the object addressed by `cid`.
    ///
    /// # Errors
    ///
    /// - [`CasError::NotFound`] if nothing is stored under `cid`
    /// - [`CasError::Timeout`] if the deadline elapsed
    /// - [`CasError::Backend`] for transport or decompression failures
    fn fetch(&self, cid: &str, deadline: Option<Duration>) -> Result<Vec<u8>, CasError>;
}

impl std::fmt::Debug for dyn ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentStore")
    }
}

/// In-memory content store for tests.
///
/// Lookups are instantaneous, so the fetch deadline is never exceeded.
/// Clones share the same underlying map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object under `cid`, replacing any previous content.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    pub fn insert(&self, cid: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(cid.into(), bytes.into());
    }

    /// Returns the number of stored objects.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns true if nothing is stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (indicates a thread panic).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
        }
    }
}

impl ContentStore for MemoryStore {
    fn fetch(&self, cid: &str, _deadline: Option<Duration>) -> Result<Vec<u8>, CasError> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(cid)
            .cloned()
            .ok_or_else(|| CasError::NotFound {
                cid: cid.to_string(),
            })
    }
}
