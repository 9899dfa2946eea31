//! Provisional Index file.
//!
//! Declares the batch's update operations, the Provisional Proof CID that
//! must accompany them, and the chunk entries. Protocol v1 requires
//! exactly one chunk entry.

use serde::Deserialize;

use crate::error::{FileKind, ProcessError};
use crate::files::OperationReference;
use crate::mapping::{DeltaMapping, SuffixSet};
use crate::protocol::ProtocolParameters;

/// The Provisional Index file shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionalIndexFile {
    /// CID of the Provisional Proof file; required whenever updates are
    /// present.
    #[serde(default, rename = "provisionalProofFileUri")]
    pub provisional_proof_uri: String,

    /// The declared update operations.
    #[serde(default)]
    pub operations: ProvisionalOperations,

    /// Chunk entries, exactly one under protocol v1.
    #[serde(default)]
    pub chunks: Vec<ChunkEntry>,
}

/// Operation arrays of the Provisional Index file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionalOperations {
    /// Update entries.
    #[serde(default)]
    pub update: Vec<OperationReference>,
}

/// One chunk entry naming a Chunk file CID.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkEntry {
    /// CID of the Chunk file.
    pub chunk_file_uri: String,
}

impl ProvisionalIndexFile {
    /// Decodes a Provisional Index file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::FileTooLarge`] or
    /// [`ProcessError::MalformedFile`].
    pub fn parse(bytes: &[u8], params: &ProtocolParameters) -> Result<Self, ProcessError> {
        super::parse_file(FileKind::ProvisionalIndex, bytes, params)
    }

    /// Validates the file against the batch context accumulated from the
    /// Core Index and registers its update operations.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::ProvisionalProofUriEmpty`] if updates are present
    ///   without a Provisional Proof CID
    /// - [`ProcessError::DuplicateOperation`] if an update suffix collides
    ///   with any suffix already seen in the batch
    /// - [`ProcessError::InvalidChunkCount`] if the chunk array length is
    ///   not the protocol's required count
    /// - [`ProcessError::MalformedFile`] if a chunk entry names an empty
    ///   CID
    pub fn validate(
        &self,
        suffixes: &mut SuffixSet,
        mapping: &mut DeltaMapping,
        params: &ProtocolParameters,
    ) -> Result<(), ProcessError> {
        if !self.operations.update.is_empty() && self.provisional_proof_uri.is_empty() {
            return Err(ProcessError::ProvisionalProofUriEmpty);
        }

        for entry in &self.operations.update {
            suffixes.insert(&entry.did_suffix)?;
            mapping.push_update(entry.did_suffix.clone());
        }

        if self.chunks.len() != params.chunk_count {
            return Err(ProcessError::InvalidChunkCount {
                count: self.chunks.len(),
            });
        }
        for entry in &self.chunks {
            if entry.chunk_file_uri.is_empty() {
                return Err(ProcessError::MalformedFile {
                    file: FileKind::ProvisionalIndex,
                    message: "chunk entry names an empty chunkFileUri".into(),
                });
            }
        }

        Ok(())
    }

    /// The update entry at `index`, if any.
    #[must_use]
    pub fn update_at(&self, index: usize) -> Option<&OperationReference> {
        self.operations.update.get(index)
    }
}
