//! Resolved per-DID operations and the batch output record.

use std::collections::BTreeMap;

use crate::anchor::Anchor;
use crate::error::{ProcessError, VerifyError};
use crate::files::{Delta, SuffixData};

/// A validated create operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOperation {
    /// Computed DID suffix of the new DID.
    pub did_suffix: String,
    /// The anchored suffix data.
    pub suffix_data: SuffixData,
    /// The initial-state delta, when the batch carried a chunk.
    pub delta: Option<Delta>,
}

/// A verified recover operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoverOperation {
    /// The DID being recovered.
    pub did_suffix: String,
    /// Reveal value that unlocked the recovery commitment.
    pub reveal_value: String,
    /// Commitment the next recovery must reveal.
    pub recovery_commitment: String,
    /// Hash the owning delta was checked against.
    pub delta_hash: String,
    /// Optional anchor-origin identifier from the signed payload.
    pub anchor_origin: Option<String>,
    /// The recovery delta, attached at emit.
    pub delta: Option<Delta>,
}

/// A verified update operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOperation {
    /// The DID being updated.
    pub did_suffix: String,
    /// Reveal value that unlocked the update commitment.
    pub reveal_value: String,
    /// Hash the owning delta was checked against.
    pub delta_hash: String,
    /// The update delta, attached at emit.
    pub delta: Option<Delta>,
}

/// A verified deactivate operation. Deactivations carry no delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivateOperation {
    /// The DID being deactivated.
    pub did_suffix: String,
    /// Reveal value that unlocked the recovery commitment.
    pub reveal_value: String,
}

/// Everything one anchor resolved to.
///
/// Operation maps are ordered by DID suffix so that iteration is
/// deterministic. A whole-batch rejection leaves the maps empty and the
/// `error` field populated; per-DID rejections appear in `rejected` and
/// remove only their own entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedOperations {
    /// Echo of the anchor string that named the batch.
    pub anchor_string: String,
    /// Echo of the anchor's ledger sequence coordinate.
    pub anchor_sequence: String,
    /// The whole-batch failure, if the batch was rejected.
    pub error: Option<ProcessError>,
    /// Create operations by DID suffix.
    pub create_ops: BTreeMap<String, CreateOperation>,
    /// Recover operations by DID suffix.
    pub recover_ops: BTreeMap<String, RecoverOperation>,
    /// Update operations by DID suffix.
    pub update_ops: BTreeMap<String, UpdateOperation>,
    /// Deactivate operations by DID suffix.
    pub deactivate_ops: BTreeMap<String, DeactivateOperation>,
    /// DIDs dropped from this batch by per-DID verification failures.
    pub rejected: BTreeMap<String, VerifyError>,
}

impl ProcessedOperations {
    /// An empty record echoing the anchor.
    #[must_use]
    pub fn new(anchor: &Anchor) -> Self {
        Self {
            anchor_string: anchor.anchor_string.clone(),
            anchor_sequence: anchor.sequence.clone(),
            ..Self::default()
        }
    }

    /// A record for a batch rejected by `error`.
    #[must_use]
    pub fn failed(anchor: &Anchor, error: ProcessError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(anchor)
        }
    }

    /// Total emitted operations across all four maps.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.create_ops.len()
            + self.recover_ops.len()
            + self.update_ops.len()
            + self.deactivate_ops.len()
    }

    /// True if the batch emitted nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_record_echoes_anchor_and_carries_error() {
        let anchor = Anchor::new("7:abc", "2.bafy");
        let record = ProcessedOperations::failed(&anchor, ProcessError::NoCoreProof);

        assert_eq!(record.anchor_string, "2.bafy");
        assert_eq!(record.anchor_sequence, "7:abc");
        assert_eq!(record.error, Some(ProcessError::NoCoreProof));
        assert!(record.is_empty());
    }

    #[test]
    fn operation_count_sums_all_categories() {
        let anchor = Anchor::new("s", "1.c");
        let mut record = ProcessedOperations::new(&anchor);
        record.deactivate_ops.insert(
            "d".into(),
            DeactivateOperation {
                did_suffix: "d".into(),
                reveal_value: "r".into(),
            },
        );
        assert_eq!(record.operation_count(), 1);
        assert!(!record.is_empty());
    }
}
