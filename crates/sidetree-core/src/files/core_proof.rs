//! Core Proof file.
//!
//! Carries the signed data for every recover and deactivate entry of the
//! Core Index, position-aligned: proof entry *i* proves index entry *i* of
//! the same category.

use serde::Deserialize;

use crate::error::{FileKind, ProcessError};
use crate::files::CoreIndexFile;
use crate::protocol::ProtocolParameters;
use crate::signed_data::SignedEntry;

/// The Core Proof file shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreProofFile {
    /// The signed-data arrays.
    #[serde(default)]
    pub operations: CoreProofOperations,
}

/// Signed-data arrays of the Core Proof file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreProofOperations {
    /// One signed entry per Core Index recover entry.
    #[serde(default)]
    pub recover: Vec<SignedEntry>,
    /// One signed entry per Core Index deactivate entry.
    #[serde(default)]
    pub deactivate: Vec<SignedEntry>,
}

impl CoreProofFile {
    /// Decodes a Core Proof file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::FileTooLarge`] or
    /// [`ProcessError::MalformedFile`].
    pub fn parse(bytes: &[u8], params: &ProtocolParameters) -> Result<Self, ProcessError> {
        super::parse_file(FileKind::CoreProof, bytes, params)
    }

    /// Checks that both arrays match the Core Index counts exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::CoreProofCountMismatch`] when either array
    /// length differs.
    pub fn validate(&self, core_index: &CoreIndexFile) -> Result<(), ProcessError> {
        let index_recover = core_index.operations.recover.len();
        let index_deactivate = core_index.operations.deactivate.len();

        if self.operations.recover.len() != index_recover
            || self.operations.deactivate.len() != index_deactivate
        {
            return Err(ProcessError::CoreProofCountMismatch {
                proof_recover: self.operations.recover.len(),
                proof_deactivate: self.operations.deactivate.len(),
                index_recover,
                index_deactivate,
            });
        }

        Ok(())
    }
}
