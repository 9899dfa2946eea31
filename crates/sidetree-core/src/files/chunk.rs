//! Chunk file.
//!
//! The Chunk file holds the ordered delta array: one state-transition
//! patch set per create, recover, and update operation of the batch.
//! Deltas carry no DID of their own; the delta-mapping assigns position
//! *i* of this array to the DID at position *i* of the mapping.

use serde::{Deserialize, Serialize};

use crate::error::{FileKind, ProcessError};
use crate::hashing::{self, CanonicalizationError};
use crate::mapping::DeltaMapping;
use crate::protocol::ProtocolParameters;

use super::patch::{Patch, PatchError};

/// The Chunk file shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkFile {
    /// The ordered delta array.
    #[serde(default)]
    pub deltas: Vec<Delta>,
}

/// One DID state transition: an ordered patch list plus the commitment the
/// next update must reveal.
///
/// Patches are kept as raw JSON values: the delta hash commits to the
/// bytes the writer canonicalized, so re-shaping them here would change
/// the hash. [`Delta::typed_patches`] offers the typed view for consumers
/// that apply patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    /// The patch list, verbatim as anchored.
    pub patches: Vec<serde_json::Value>,
    /// Commitment for the next update operation.
    pub update_commitment: String,
}

impl Delta {
    /// Computes the delta hash: `b64url(multihash(sha256(jcs(delta))))`.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] if the delta cannot be
    /// canonicalized.
    pub fn hash(&self) -> Result<String, CanonicalizationError> {
        hashing::hash_value(self)
    }

    /// Parses each raw patch into the typed vocabulary.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatchError`] for a known action whose shape is
    /// invalid. Unknown actions parse to [`Patch::Unknown`] and are left
    /// to the document layer.
    pub fn typed_patches(&self) -> Result<Vec<Patch>, PatchError> {
        self.patches.iter().map(Patch::from_value).collect()
    }
}

impl ChunkFile {
    /// Decodes a Chunk file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::FileTooLarge`] or
    /// [`ProcessError::MalformedFile`].
    pub fn parse(bytes: &[u8], params: &ProtocolParameters) -> Result<Self, ProcessError> {
        super::parse_file(FileKind::Chunk, bytes, params)
    }

    /// Checks that the delta array lines up one-to-one with the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::InvalidDeltaCount`] when the lengths differ.
    pub fn validate(&self, mapping: &DeltaMapping) -> Result<(), ProcessError> {
        if self.deltas.len() != mapping.len() {
            return Err(ProcessError::InvalidDeltaCount {
                deltas: self.deltas.len(),
                mapping: mapping.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn delta_hash_is_stable_under_patch_reordering_of_keys() {
        let a: Delta = serde_json::from_value(json!({
            "patches": [{"action": "replace", "document": {}}],
            "updateCommitment": "C"
        }))
        .unwrap();
        let b: Delta = serde_json::from_value(json!({
            "updateCommitment": "C",
            "patches": [{"document": {}, "action": "replace"}]
        }))
        .unwrap();

        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn delta_hash_changes_with_commitment() {
        let mut delta: Delta = serde_json::from_value(json!({
            "patches": [],
            "updateCommitment": "C1"
        }))
        .unwrap();
        let first = delta.hash().unwrap();
        delta.update_commitment = "C2".into();
        assert_ne!(first, delta.hash().unwrap());
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let chunk: ChunkFile = serde_json::from_value(json!({
            "deltas": [{"patches": [], "updateCommitment": "C"}]
        }))
        .unwrap();

        let err = chunk.validate(&DeltaMapping::new()).unwrap_err();
        assert_eq!(
            err,
            ProcessError::InvalidDeltaCount {
                deltas: 1,
                mapping: 0
            }
        );
    }

    #[test]
    fn empty_chunk_matches_empty_mapping() {
        let chunk = ChunkFile::default();
        chunk.validate(&DeltaMapping::new()).unwrap();
    }
}
