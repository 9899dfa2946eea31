//! # sidetree-core
//!
//! Batch resolver core for the Sidetree DID anchoring protocol.
//!
//! Sidetree scales DID operations by anchoring batches of state
//! transitions on an append-only ledger while the operation payloads live
//! in a content-addressed store (CAS). Given an anchor record from the
//! ledger layer, this crate fetches the batch's file hierarchy from the
//! CAS, validates every file against cryptographic commitments and against
//! the other files, and emits a deterministic, ordered set of per-DID
//! operations (create, recover, update, deactivate) for downstream
//! document-layer consumers.
//!
//! ## Scope
//!
//! The crate consumes two narrow interfaces, a [`ContentStore`] fetch
//! trait and `tracing` for structured logs, and produces one record,
//! [`ProcessedOperations`]. Ledger scanning, the CAS transport itself,
//! DID-document patch application, and persistence all live with the
//! caller.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sidetree_core::{process_batch, Anchor, MemoryStore, ProcessorOptions};
//!
//! let store = MemoryStore::new();
//! store.insert("bafy-core-index", br#"{}"#.to_vec());
//!
//! let options = ProcessorOptions::builder()
//!     .method("ion")
//!     .cas(Arc::new(store))
//!     .build();
//!
//! let records = process_batch(vec![Anchor::new("1042:0:7", "1.bafy-core-index")], &options);
//! assert!(records[0].error.is_none());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod anchor;
pub mod batch;
pub mod cas;
pub mod error;
pub mod files;
pub mod hashing;
pub mod jws;
pub mod mapping;
pub mod operations;
pub mod options;
pub mod processor;
pub mod protocol;
pub mod signed_data;

pub use anchor::{Anchor, ParsedAnchor};
pub use batch::{process_batch, process_batch_parallel};
pub use cas::{CasError, ContentStore, MemoryStore};
pub use error::{FileKind, ProcessError, VerifyError};
pub use operations::{
    CreateOperation, DeactivateOperation, ProcessedOperations, RecoverOperation, UpdateOperation,
};
pub use options::{FeePolicy, ProcessorOptions, ProcessorOptionsBuilder};
pub use processor::OperationsProcessor;
pub use protocol::ProtocolParameters;
