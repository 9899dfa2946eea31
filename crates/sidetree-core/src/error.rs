//! Error taxonomy for batch processing.
//!
//! Two families of failure exist, with different propagation rules:
//!
//! - [`ProcessError`]: structural, configuration, and I/O failures. Any of
//!   these rejects the entire anchored batch; the pipeline stops and the
//!   error lands in the `error` field of the processed-operations record.
//! - [`VerifyError`]: cryptographic failures scoped to a single DID (bad
//!   signature, reveal mismatch, delta-hash mismatch). These are logged,
//!   recorded in the rejected-DID map, and skip only the affected DID; the
//!   rest of the batch proceeds.

use std::fmt;

use thiserror::Error;

/// Identifies which of the five batch files an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// The Core Index file named by the anchor string.
    CoreIndex,
    /// The Core Proof file named by the Core Index.
    CoreProof,
    /// The Provisional Index file named by the Core Index.
    ProvisionalIndex,
    /// The Provisional Proof file named by the Provisional Index.
    ProvisionalProof,
    /// The Chunk file named by the Provisional Index.
    Chunk,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CoreIndex => "core index file",
            Self::CoreProof => "core proof file",
            Self::ProvisionalIndex => "provisional index file",
            Self::ProvisionalProof => "provisional proof file",
            Self::Chunk => "chunk file",
        };
        f.write_str(name)
    }
}

/// Whole-batch failure: any one of these rejects the entire anchor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProcessError {
    /// The anchor string does not have the `<opCount>.<CID>` form, names a
    /// zero operation count, or names an empty CID.
    #[error("anchor string {anchor:?} does not name an operation count and core index CID")]
    EmptyAnchorUri {
        /// The offending anchor string.
        anchor: String,
    },

    /// The DID method prefix supplied in the options is empty.
    #[error("DID method prefix is empty")]
    InvalidMethod,

    /// No content store was supplied in the options.
    #[error("no content store configured")]
    InvalidCas,

    /// The content store has no object for the given CID.
    #[error("{file} {cid} not found in content store")]
    CasNotFound {
        /// Which file was being fetched.
        file: FileKind,
        /// The CID that could not be resolved.
        cid: String,
    },

    /// The fetch did not complete within its deadline.
    #[error("fetch of {file} {cid} exceeded its deadline")]
    CasTimeout {
        /// Which file was being fetched.
        file: FileKind,
        /// The CID whose fetch timed out.
        cid: String,
    },

    /// The content store failed for a reason other than absence or timeout.
    #[error("content store failed fetching {file} {cid}: {message}")]
    CasFailure {
        /// Which file was being fetched.
        file: FileKind,
        /// The CID whose fetch failed.
        cid: String,
        /// Backend-supplied description.
        message: String,
    },

    /// The fetched bytes do not decode as the expected JSON shape.
    #[error("{file} does not decode: {message}")]
    MalformedFile {
        /// Which file failed to decode.
        file: FileKind,
        /// Decoder description of the failure.
        message: String,
    },

    /// The fetched bytes exceed the protocol maximum for the file type.
    #[error("{file} is {size} bytes, over the protocol maximum of {max}")]
    FileTooLarge {
        /// Which file was too large.
        file: FileKind,
        /// Observed byte length.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The Core Index declares recover or deactivate operations but names no
    /// Core Proof CID.
    #[error("core index declares recover or deactivate operations but no core proof CID")]
    NoCoreProof,

    /// A DID suffix appears more than once across the batch's operations.
    #[error("DID suffix {suffix} appears more than once in the batch")]
    DuplicateOperation {
        /// The colliding suffix.
        suffix: String,
    },

    /// Core Proof array lengths do not match the Core Index.
    #[error(
        "core proof carries {proof_recover} recover and {proof_deactivate} deactivate entries \
         for a core index with {index_recover} and {index_deactivate}"
    )]
    CoreProofCountMismatch {
        /// Recover entries in the Core Proof.
        proof_recover: usize,
        /// Deactivate entries in the Core Proof.
        proof_deactivate: usize,
        /// Recover entries in the Core Index.
        index_recover: usize,
        /// Deactivate entries in the Core Index.
        index_deactivate: usize,
    },

    /// The Provisional Index declares updates but names no Provisional Proof
    /// CID.
    #[error("provisional index declares update operations but no provisional proof CID")]
    ProvisionalProofUriEmpty,

    /// Provisional Proof update count does not match the Provisional Index.
    #[error("provisional proof carries {proof} update entries for an index with {index}")]
    ProofIndexMismatch {
        /// Update entries in the Provisional Proof.
        proof: usize,
        /// Update entries in the Provisional Index.
        index: usize,
    },

    /// The update mapping has fewer entries than the Provisional Proof.
    #[error("update mapping has {mapping} entries for {proof} proof entries")]
    UpdateMappingMismatch {
        /// Entries in the update mapping.
        mapping: usize,
        /// Update entries in the Provisional Proof.
        proof: usize,
    },

    /// Chunk delta count does not equal the delta-mapping length.
    #[error("chunk carries {deltas} deltas for {mapping} mapped operations")]
    InvalidDeltaCount {
        /// Deltas in the Chunk file.
        deltas: usize,
        /// Entries in the combined delta mapping.
        mapping: usize,
    },

    /// The Provisional Index chunk array is not exactly one entry long.
    #[error("provisional index declares {count} chunk entries, protocol v1 requires exactly 1")]
    InvalidChunkCount {
        /// Observed chunk entries.
        count: usize,
    },

    /// The per-operation fee predicate rejected the batch.
    #[error("per-operation fee check rejected the batch")]
    FeeRejected,

    /// The value-lock predicate rejected the batch.
    #[error("value lock check rejected the batch")]
    ValueLockRejected,
}

/// Per-DID cryptographic failure: the affected DID is skipped, the batch
/// proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum VerifyError {
    /// A value that should be base64url multihash data (or a compact JWS
    /// segment) does not decode.
    #[error("malformed encoding: {message}")]
    MalformedEncoding {
        /// Decoder description of the failure.
        message: String,
    },

    /// The embedded public key does not hash to the expected reveal value.
    #[error("embedded key hashes to {computed}, operation revealed {expected}")]
    RevealMismatch {
        /// The reveal value declared in the index file.
        expected: String,
        /// The reveal computed from the embedded key.
        computed: String,
    },

    /// The JWS signature does not verify under the embedded key.
    #[error("JWS signature does not verify under the embedded key")]
    SignatureInvalid,

    /// The chunk delta does not hash to the value the signed data committed
    /// to.
    #[error("delta hashes to {computed}, signed data committed to {expected}")]
    DeltaHashMismatch {
        /// The delta hash carried in the signed payload.
        expected: String,
        /// The hash computed from the chunk delta.
        computed: String,
    },

    /// The JWS protected header names an algorithm this crate does not
    /// verify.
    #[error("unsupported JWS algorithm {alg:?}")]
    UnsupportedAlgorithm {
        /// The `alg` header value.
        alg: String,
    },
}
