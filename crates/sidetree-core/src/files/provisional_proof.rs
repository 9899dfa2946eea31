//! Provisional Proof file.
//!
//! Carries the signed data for every update entry of the Provisional
//! Index, position-aligned with that file's update array.

use serde::Deserialize;

use crate::error::{FileKind, ProcessError};
use crate::files::ProvisionalIndexFile;
use crate::mapping::DeltaMapping;
use crate::protocol::ProtocolParameters;
use crate::signed_data::SignedEntry;

/// The Provisional Proof file shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionalProofFile {
    /// The signed-data array.
    #[serde(default)]
    pub operations: ProvisionalProofOperations,
}

/// Signed-data array of the Provisional Proof file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionalProofOperations {
    /// One signed entry per Provisional Index update entry.
    #[serde(default)]
    pub update: Vec<SignedEntry>,
}

impl ProvisionalProofFile {
    /// Decodes a Provisional Proof file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::FileTooLarge`] or
    /// [`ProcessError::MalformedFile`].
    pub fn parse(bytes: &[u8], params: &ProtocolParameters) -> Result<Self, ProcessError> {
        super::parse_file(FileKind::ProvisionalProof, bytes, params)
    }

    /// Checks count parity with the Provisional Index and the update
    /// mapping.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::ProofIndexMismatch`] if the update counts differ
    /// - [`ProcessError::UpdateMappingMismatch`] if the update mapping has
    ///   fewer entries than this file (the mapping is built from the index,
    ///   so this only fires on an internal inconsistency)
    pub fn validate(
        &self,
        provisional_index: &ProvisionalIndexFile,
        mapping: &DeltaMapping,
    ) -> Result<(), ProcessError> {
        let proof = self.operations.update.len();
        let index = provisional_index.operations.update.len();
        if proof != index {
            return Err(ProcessError::ProofIndexMismatch { proof, index });
        }

        if mapping.update_len() < proof {
            return Err(ProcessError::UpdateMappingMismatch {
                mapping: mapping.update_len(),
                proof,
            });
        }

        Ok(())
    }
}
