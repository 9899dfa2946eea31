//! Canonical hashing pipeline.
//!
//! Every cryptographic identifier in the protocol derives from one
//! pipeline: serialize to JSON, canonicalize with JCS (RFC 8785), SHA-256,
//! wrap in a multihash envelope (code `0x12`, SHA2-256), and base64url
//! encode without padding.
//!
//! Three quantities come out of it:
//!
//! - **DID suffix**: the pipeline applied to a create operation's suffix
//!   data.
//! - **Reveal**: the pipeline applied to a public key.
//! - **Commitment**: as reveal, but with the SHA-256 applied twice. A
//!   commitment published in one batch is matched by revealing its preimage
//!   key in a later one; [`check_reveal`] performs that match.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use multihash::Multihash;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::VerifyError;

/// Multihash code for SHA2-256.
const SHA2_256: u64 = 0x12;

/// Error canonicalizing a value to JCS bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value cannot be canonicalized: {message}")]
pub struct CanonicalizationError {
    /// Serializer description of the failure.
    pub message: String,
}

/// Serializes a value and canonicalizes it per RFC 8785.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if the value cannot be represented as
/// canonical JSON (non-string map keys, non-finite numbers).
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalizationError> {
    serde_jcs::to_vec(value).map_err(|err| CanonicalizationError {
        message: err.to_string(),
    })
}

/// Wraps a SHA-256 digest in a multihash envelope and base64url encodes it.
fn encode_multihash(digest: &[u8; 32]) -> String {
    let wrapped = Multihash::<64>::wrap(SHA2_256, digest)
        .expect("a 32-byte digest fits the 64-byte multihash table");
    URL_SAFE_NO_PAD.encode(wrapped.to_bytes())
}

/// Runs the full pipeline over a serializable value.
///
/// This is the DID-suffix and delta-hash derivation:
/// `b64url(multihash(sha256(jcs(value))))`.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if the value cannot be canonicalized.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String, CanonicalizationError> {
    let jcs = canonical_json(value)?;
    Ok(encode_multihash(&Sha256::digest(&jcs).into()))
}

/// Computes the reveal value of canonicalized key bytes:
/// `b64url(multihash(sha256(jcs)))`.
#[must_use]
pub fn hash_reveal(jcs: &[u8]) -> String {
    encode_multihash(&Sha256::digest(jcs).into())
}

/// Computes the commitment of canonicalized key bytes:
/// `b64url(multihash(sha256(sha256(jcs))))`.
#[must_use]
pub fn hash_commitment(jcs: &[u8]) -> String {
    let once: [u8; 32] = Sha256::digest(jcs).into();
    encode_multihash(&Sha256::digest(once).into())
}

/// Computes the reveal value of a public key.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if the key cannot be canonicalized.
pub fn reveal<T: Serialize>(key: &T) -> Result<String, CanonicalizationError> {
    Ok(hash_reveal(&canonical_json(key)?))
}

/// Computes the commitment of a public key.
///
/// # Errors
///
/// Returns [`CanonicalizationError`] if the key cannot be canonicalized.
pub fn commitment<T: Serialize>(key: &T) -> Result<String, CanonicalizationError> {
    Ok(hash_commitment(&canonical_json(key)?))
}

/// Checks that a reveal value is the preimage of a commitment.
///
/// The reveal is decoded, its multihash envelope stripped to recover the
/// raw digest, the digest SHA-256'd once more, re-wrapped, re-encoded, and
/// compared to the commitment.
///
/// # Errors
///
/// Returns [`VerifyError::MalformedEncoding`] if the reveal value is not
/// base64url SHA2-256 multihash data. A well-formed reveal that simply does
/// not match yields `Ok(false)`.
pub fn check_reveal(reveal: &str, commitment: &str) -> Result<bool, VerifyError> {
    let raw = URL_SAFE_NO_PAD
        .decode(reveal)
        .map_err(|err| VerifyError::MalformedEncoding {
            message: format!("reveal value is not base64url: {err}"),
        })?;

    let decoded =
        Multihash::<64>::from_bytes(&raw).map_err(|err| VerifyError::MalformedEncoding {
            message: format!("reveal value is not a multihash: {err}"),
        })?;
    if decoded.code() != SHA2_256 {
        return Err(VerifyError::MalformedEncoding {
            message: format!("reveal multihash code {:#x} is not SHA2-256", decoded.code()),
        });
    }

    let rehashed = encode_multihash(&Sha256::digest(decoded.digest()).into());
    Ok(rehashed == commitment)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn hash_value_is_deterministic_across_key_order() {
        let a = json!({"deltaHash": "h", "recoveryCommitment": "c"});
        let b = json!({"recoveryCommitment": "c", "deltaHash": "h"});

        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
    }

    #[test]
    fn reveal_is_preimage_of_commitment() {
        let key = json!({"kty": "EC", "crv": "secp256k1", "x": "abc", "y": "def"});
        let reveal = reveal(&key).unwrap();
        let commitment = commitment(&key).unwrap();

        assert!(check_reveal(&reveal, &commitment).unwrap());
    }

    #[test]
    fn reveal_of_other_key_does_not_match() {
        let key = json!({"kty": "EC", "crv": "secp256k1", "x": "abc", "y": "def"});
        let other = json!({"kty": "EC", "crv": "secp256k1", "x": "abc", "y": "deg"});

        let reveal = reveal(&key).unwrap();
        let commitment = commitment(&other).unwrap();
        assert!(!check_reveal(&reveal, &commitment).unwrap());
    }

    #[test]
    fn check_reveal_rejects_non_base64() {
        let err = check_reveal("not/base64url!", "anything").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedEncoding { .. }));
    }

    #[test]
    fn check_reveal_rejects_bare_digest_without_envelope() {
        // 32 raw digest bytes without the multihash prefix.
        let bare = URL_SAFE_NO_PAD.encode([7u8; 32]);
        let err = check_reveal(&bare, "anything").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedEncoding { .. }));
    }

    #[test]
    fn encoded_hash_has_multihash_prefix() {
        let encoded = hash_value(&json!({"a": 1})).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(encoded).unwrap();
        // 0x12 = SHA2-256, 0x20 = 32-byte digest.
        assert_eq!(&raw[..2], &[0x12, 0x20]);
        assert_eq!(raw.len(), 34);
    }

    proptest! {
        #[test]
        fn reveal_commitment_roundtrip(key_bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
            let key = json!({"kty": "oct", "k": URL_SAFE_NO_PAD.encode(&key_bytes)});
            let reveal = reveal(&key).unwrap();
            let commitment = commitment(&key).unwrap();
            prop_assert!(check_reveal(&reveal, &commitment).unwrap());
        }

        #[test]
        fn distinct_keys_never_cross_match(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
            prop_assume!(a != b);
            let key_a = json!({"kty": "oct", "k": a});
            let key_b = json!({"kty": "oct", "k": b});
            prop_assert!(!check_reveal(&reveal(&key_a).unwrap(), &commitment(&key_b).unwrap()).unwrap());
        }
    }
}
