//! Protocol constants.
//!
//! File-size maxima are enforced at each parse; the numeric values are
//! deployment configuration, so they live in a parameter struct with v1
//! defaults rather than as hard-coded constants.

use serde::{Deserialize, Serialize};

use crate::error::FileKind;

const ONE_MIB: usize = 1024 * 1024;

/// Tunable protocol parameters with version-1 defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Maximum Core Index file size in bytes.
    #[serde(default = "default_index_size")]
    pub max_core_index_size: usize,

    /// Maximum Core Proof file size in bytes.
    #[serde(default = "default_index_size")]
    pub max_core_proof_size: usize,

    /// Maximum Provisional Index file size in bytes.
    #[serde(default = "default_index_size")]
    pub max_provisional_index_size: usize,

    /// Maximum Provisional Proof file size in bytes.
    #[serde(default = "default_index_size")]
    pub max_provisional_proof_size: usize,

    /// Maximum Chunk file size in bytes.
    #[serde(default = "default_chunk_size")]
    pub max_chunk_size: usize,

    /// Number of chunk entries a Provisional Index must declare.
    /// Version 1 of the protocol fixes this at one.
    #[serde(default = "default_chunk_count")]
    pub chunk_count: usize,
}

const fn default_index_size() -> usize {
    ONE_MIB
}

const fn default_chunk_size() -> usize {
    10 * ONE_MIB
}

const fn default_chunk_count() -> usize {
    1
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            max_core_index_size: default_index_size(),
            max_core_proof_size: default_index_size(),
            max_provisional_index_size: default_index_size(),
            max_provisional_proof_size: default_index_size(),
            max_chunk_size: default_chunk_size(),
            chunk_count: default_chunk_count(),
        }
    }
}

impl ProtocolParameters {
    /// The size cap that applies to a given file type.
    #[must_use]
    pub fn max_size_for(&self, file: FileKind) -> usize {
        match file {
            FileKind::CoreIndex => self.max_core_index_size,
            FileKind::CoreProof => self.max_core_proof_size,
            FileKind::ProvisionalIndex => self.max_provisional_index_size,
            FileKind::ProvisionalProof => self.max_provisional_proof_size,
            FileKind::Chunk => self.max_chunk_size,
        }
    }
}
