//! Ledger anchor records.
//!
//! The ledger layer hands the resolver opaque anchor records: a sequence
//! coordinate (the ledger's own ordering key, used only for reporting) and
//! an anchor string of the form `<opCount>.<CID>`. The anchor's
//! authenticity is the ledger's business; this module only parses and
//! orders.

use crate::error::ProcessError;

/// A ledger anchor pointing at one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Ledger-native ordering key, e.g. `height:blockhash:txindex`.
    pub sequence: String,
    /// The anchor string, `<opCount>.<CID>`.
    pub anchor_string: String,
}

/// The decoded parts of a valid anchor string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnchor {
    /// Declared operation count, always greater than zero.
    pub op_count: u64,
    /// CID of the batch's Core Index file.
    pub core_index_cid: String,
}

impl Anchor {
    /// Creates an anchor record.
    pub fn new(sequence: impl Into<String>, anchor_string: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            anchor_string: anchor_string.into(),
        }
    }

    /// Parses the anchor string.
    ///
    /// The normative grammar is `opCount "." CID` with a decimal-ASCII
    /// operation count. Strings without the dot, a zero or unparseable
    /// count, or an empty CID are rejected before any fetch happens.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::EmptyAnchorUri`] on any grammar violation.
    pub fn parse(&self) -> Result<ParsedAnchor, ProcessError> {
        let reject = || ProcessError::EmptyAnchorUri {
            anchor: self.anchor_string.clone(),
        };

        let (count, cid) = self.anchor_string.split_once('.').ok_or_else(reject)?;
        let op_count: u64 = count.parse().map_err(|_| reject())?;
        if op_count == 0 || cid.is_empty() {
            return Err(reject());
        }

        Ok(ParsedAnchor {
            op_count,
            core_index_cid: cid.to_string(),
        })
    }
}

/// Sorts anchors by their sequence coordinate.
///
/// Sequence coordinates are opaque strings, so the order is lexicographic;
/// ledgers that need numeric ordering should emit fixed-width coordinates.
pub fn sort_by_sequence(anchors: &mut [Anchor]) {
    anchors.sort_by(|a, b| a.sequence.cmp(&b.sequence));
}

/// Returns true if an anchor with the same sequence coordinate is already
/// present.
#[must_use]
pub fn already_anchored(anchors: &[Anchor], candidate: &Anchor) -> bool {
    anchors.iter().any(|a| a.sequence == candidate.sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_and_cid() {
        let anchor = Anchor::new("100:abcd:0", "17.bafy-core-index");
        let parsed = anchor.parse().unwrap();
        assert_eq!(parsed.op_count, 17);
        assert_eq!(parsed.core_index_cid, "bafy-core-index");
    }

    #[test]
    fn cid_may_itself_contain_dots() {
        let anchor = Anchor::new("s", "1.Qm.with.dots");
        assert_eq!(anchor.parse().unwrap().core_index_cid, "Qm.with.dots");
    }

    #[test]
    fn dotless_anchor_is_rejected() {
        let anchor = Anchor::new("s", "bafy-raw-cid");
        assert!(matches!(
            anchor.parse(),
            Err(ProcessError::EmptyAnchorUri { .. })
        ));
    }

    #[test]
    fn zero_operations_is_rejected() {
        let anchor = Anchor::new("s", "0.bafy-core-index");
        assert!(matches!(
            anchor.parse(),
            Err(ProcessError::EmptyAnchorUri { .. })
        ));
    }

    #[test]
    fn empty_cid_and_non_decimal_count_are_rejected() {
        for bad in ["3.", "x.bafy", ".bafy", "-1.bafy"] {
            let anchor = Anchor::new("s", bad);
            assert!(anchor.parse().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn sorting_is_by_sequence() {
        let mut anchors = vec![
            Anchor::new("0000200:a", "1.b"),
            Anchor::new("0000100:z", "1.a"),
        ];
        sort_by_sequence(&mut anchors);
        assert_eq!(anchors[0].anchor_string, "1.a");
    }

    #[test]
    fn duplicate_detection_is_by_sequence() {
        let anchors = vec![Anchor::new("0000100:z", "1.a")];
        assert!(already_anchored(&anchors, &Anchor::new("0000100:z", "1.b")));
        assert!(!already_anchored(&anchors, &Anchor::new("0000101:z", "1.a")));
    }
}
