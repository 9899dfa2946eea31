//! Core Index file.
//!
//! The Core Index is the batch's root: it names the Provisional Index and
//! Core Proof CIDs and declares the batch's create, recover, and
//! deactivate operations. Its validation performs the fused duplicate pass
//! that seeds the suffix set and the first two segments of the delta
//! mapping.

use serde::{Deserialize, Serialize};

use crate::error::{FileKind, ProcessError};
use crate::hashing::{self, CanonicalizationError};
use crate::mapping::{DeltaMapping, SuffixSet};
use crate::protocol::ProtocolParameters;

/// The Core Index file shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreIndexFile {
    /// CID of the Provisional Index file; empty when the batch carries no
    /// chunk-derived state.
    #[serde(default, rename = "provisionalIndexFileUri")]
    pub provisional_index_uri: String,

    /// CID of the Core Proof file; required whenever recover or deactivate
    /// operations are present.
    #[serde(default, rename = "coreProofFileUri")]
    pub core_proof_uri: String,

    /// Writer-lock identifier handed to the value-lock fee hook.
    #[serde(default)]
    pub writer_lock_id: String,

    /// The declared operations.
    #[serde(default)]
    pub operations: CoreOperations,
}

/// Operation arrays of the Core Index file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreOperations {
    /// Create entries, each carrying suffix data.
    #[serde(default)]
    pub create: Vec<CreateEntry>,
    /// Recover entries.
    #[serde(default)]
    pub recover: Vec<OperationReference>,
    /// Deactivate entries.
    #[serde(default)]
    pub deactivate: Vec<OperationReference>,
}

/// One create entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntry {
    /// The suffix data whose hash is the new DID's suffix.
    pub suffix_data: SuffixData,
}

/// A reference to an existing DID: suffix plus the reveal value unlocking
/// the relevant commitment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReference {
    /// The DID suffix the operation applies to.
    pub did_suffix: String,
    /// Reveal value for the update or recovery commitment.
    #[serde(default)]
    pub reveal_value: String,
}

/// The metadata whose canonical hash is the short-form DID suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuffixData {
    /// Optional DID type string.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub suffix_type: Option<String>,

    /// Hash of the create operation's delta.
    pub delta_hash: String,

    /// Commitment the first recovery must reveal.
    pub recovery_commitment: String,

    /// Optional anchor-origin identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<String>,
}

impl SuffixData {
    /// Computes the short-form DID suffix:
    /// `b64url(multihash(sha256(jcs(suffix data))))`.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] if the suffix data cannot be
    /// canonicalized.
    pub fn did_suffix(&self) -> Result<String, CanonicalizationError> {
        hashing::hash_value(self)
    }
}

impl CoreIndexFile {
    /// Decodes a Core Index file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::FileTooLarge`] or
    /// [`ProcessError::MalformedFile`].
    pub fn parse(bytes: &[u8], params: &ProtocolParameters) -> Result<Self, ProcessError> {
        super::parse_file(FileKind::CoreIndex, bytes, params)
    }

    /// True when the operations require a Core Proof file.
    #[must_use]
    pub fn requires_core_proof(&self) -> bool {
        !self.operations.recover.is_empty() || !self.operations.deactivate.is_empty()
    }

    /// Validates the file and registers its operations in the batch
    /// context.
    ///
    /// Every create suffix is computed and inserted into the suffix set,
    /// followed by every recover and deactivate suffix, in file order; any
    /// collision rejects the batch. Creates and recovers are appended to
    /// the delta mapping. Returns the computed create suffixes, aligned
    /// with `operations.create`.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::NoCoreProof`] if recovers or deactivates are
    ///   present without a Core Proof CID
    /// - [`ProcessError::DuplicateOperation`] on any suffix collision
    /// - [`ProcessError::MalformedFile`] if a create's suffix data cannot
    ///   be canonicalized
    pub fn validate(
        &self,
        suffixes: &mut SuffixSet,
        mapping: &mut DeltaMapping,
    ) -> Result<Vec<String>, ProcessError> {
        if self.requires_core_proof() && self.core_proof_uri.is_empty() {
            return Err(ProcessError::NoCoreProof);
        }

        let mut create_suffixes = Vec::with_capacity(self.operations.create.len());
        for entry in &self.operations.create {
            let suffix =
                entry
                    .suffix_data
                    .did_suffix()
                    .map_err(|err| ProcessError::MalformedFile {
                        file: FileKind::CoreIndex,
                        message: err.to_string(),
                    })?;
            suffixes.insert(&suffix)?;
            mapping.push_create(suffix.clone());
            create_suffixes.push(suffix);
        }

        for entry in &self.operations.recover {
            suffixes.insert(&entry.did_suffix)?;
            mapping.push_recover(entry.did_suffix.clone());
        }

        for entry in &self.operations.deactivate {
            suffixes.insert(&entry.did_suffix)?;
        }

        Ok(create_suffixes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn index_from(value: serde_json::Value) -> CoreIndexFile {
        CoreIndexFile::parse(value.to_string().as_bytes(), &ProtocolParameters::default()).unwrap()
    }

    #[test]
    fn suffix_ignores_field_order_and_optional_absence() {
        let a = SuffixData {
            suffix_type: None,
            delta_hash: "H".into(),
            recovery_commitment: "C".into(),
            anchor_origin: None,
        };
        let b: SuffixData =
            serde_json::from_value(json!({"recoveryCommitment": "C", "deltaHash": "H"})).unwrap();

        assert_eq!(a.did_suffix().unwrap(), b.did_suffix().unwrap());
    }

    #[test]
    fn recover_without_core_proof_uri_is_rejected() {
        let index = index_from(json!({
            "operations": {"recover": [{"didSuffix": "abc", "revealValue": "r"}]}
        }));

        let err = index
            .validate(&mut SuffixSet::new(), &mut DeltaMapping::new())
            .unwrap_err();
        assert_eq!(err, ProcessError::NoCoreProof);
    }

    #[test]
    fn duplicate_recover_suffix_is_rejected() {
        let index = index_from(json!({
            "coreProofFileUri": "bafy-proof",
            "operations": {"recover": [
                {"didSuffix": "abc", "revealValue": "r1"},
                {"didSuffix": "abc", "revealValue": "r2"}
            ]}
        }));

        let err = index
            .validate(&mut SuffixSet::new(), &mut DeltaMapping::new())
            .unwrap_err();
        assert_eq!(
            err,
            ProcessError::DuplicateOperation {
                suffix: "abc".into()
            }
        );
    }

    #[test]
    fn create_deactivate_overlap_is_rejected() {
        let suffix_data = SuffixData {
            suffix_type: None,
            delta_hash: "H".into(),
            recovery_commitment: "C".into(),
            anchor_origin: None,
        };
        let computed = suffix_data.did_suffix().unwrap();

        let index = index_from(json!({
            "coreProofFileUri": "bafy-proof",
            "operations": {
                "create": [{"suffixData": {"deltaHash": "H", "recoveryCommitment": "C"}}],
                "deactivate": [{"didSuffix": computed, "revealValue": "r"}]
            }
        }));

        let err = index
            .validate(&mut SuffixSet::new(), &mut DeltaMapping::new())
            .unwrap_err();
        assert_eq!(err, ProcessError::DuplicateOperation { suffix: computed });
    }

    #[test]
    fn validate_registers_creates_and_recovers_in_mapping_order() {
        let index = index_from(json!({
            "coreProofFileUri": "bafy-proof",
            "operations": {
                "create": [{"suffixData": {"deltaHash": "H", "recoveryCommitment": "C"}}],
                "recover": [{"didSuffix": "rec-1", "revealValue": "r"}],
                "deactivate": [{"didSuffix": "dea-1", "revealValue": "r"}]
            }
        }));

        let mut suffixes = SuffixSet::new();
        let mut mapping = DeltaMapping::new();
        let created = index.validate(&mut suffixes, &mut mapping).unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.suffix_at(0), Some(created[0].as_str()));
        assert_eq!(mapping.suffix_at(1), Some("rec-1"));
        // Deactivates are in the suffix set but never own a delta.
        assert_eq!(suffixes.len(), 3);
    }

    #[test]
    fn empty_object_parses_to_empty_batch_root() {
        let index = index_from(json!({}));
        assert!(index.provisional_index_uri.is_empty());
        assert!(!index.requires_core_proof());
        assert!(index.operations.create.is_empty());
    }
}
