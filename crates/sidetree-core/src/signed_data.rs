//! Signed operation data.
//!
//! Recover, deactivate, and update operations prove control of a DID with
//! a compact JWS whose payload embeds the controlling public key. The
//! verification procedure for an entry and its expected reveal value is:
//!
//! 1. parse the JWS and decode its payload,
//! 2. extract the embedded key and canonicalize it (JCS),
//! 3. compute the key's reveal value and compare it to the expected one,
//! 4. verify the JWS signature with the embedded key,
//! 5. for update and recover, expose `deltaHash` for the chunk-stage
//!    cross-check.
//!
//! All functions here are pure; failures are per-DID
//! ([`VerifyError`]) and never reject the whole batch.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::VerifyError;
use crate::hashing;
use crate::jws::{CompactJws, Jwk};

/// One signed-data entry as it appears in proof files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEntry {
    /// The compact JWS string.
    #[serde(default)]
    pub signed_data: String,
}

/// Protected payload of an update operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    /// Key whose reveal value the Provisional Index declared.
    pub update_key: Jwk,
    /// Hash the owning chunk delta must match.
    pub delta_hash: String,
}

/// Protected payload of a recover operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverPayload {
    /// Key whose reveal value the Core Index declared.
    pub recovery_key: Jwk,
    /// Commitment the next recovery must reveal.
    pub recovery_commitment: String,
    /// Hash the owning chunk delta must match.
    pub delta_hash: String,
    /// Optional anchor-origin identifier.
    #[serde(default)]
    pub anchor_origin: Option<String>,
}

/// Protected payload of a deactivate operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivatePayload {
    /// The DID being deactivated.
    pub did_suffix: String,
    /// Key whose reveal value the Core Index declared.
    pub recovery_key: Jwk,
}

/// Verifies an update entry against its expected reveal value.
///
/// # Errors
///
/// See [`verify_signed_data`].
pub fn verify_update(signed_data: &str, expected_reveal: &str) -> Result<UpdatePayload, VerifyError> {
    verify_signed_data(signed_data, expected_reveal, |payload: &UpdatePayload| {
        &payload.update_key
    })
}

/// Verifies a recover entry against its expected reveal value.
///
/// # Errors
///
/// See [`verify_signed_data`].
pub fn verify_recover(
    signed_data: &str,
    expected_reveal: &str,
) -> Result<RecoverPayload, VerifyError> {
    verify_signed_data(signed_data, expected_reveal, |payload: &RecoverPayload| {
        &payload.recovery_key
    })
}

/// Verifies a deactivate entry against its expected reveal value.
///
/// # Errors
///
/// See [`verify_signed_data`].
pub fn verify_deactivate(
    signed_data: &str,
    expected_reveal: &str,
) -> Result<DeactivatePayload, VerifyError> {
    verify_signed_data(signed_data, expected_reveal, |payload: &DeactivatePayload| {
        &payload.recovery_key
    })
}

/// The shared verification procedure, parameterized over the payload shape
/// and its key accessor.
///
/// # Errors
///
/// - [`VerifyError::MalformedEncoding`] if the JWS, its payload, or the
///   embedded key do not decode
/// - [`VerifyError::RevealMismatch`] if the embedded key does not hash to
///   `expected_reveal`
/// - [`VerifyError::SignatureInvalid`] /
///   [`VerifyError::UnsupportedAlgorithm`] from signature verification
fn verify_signed_data<T, F>(
    signed_data: &str,
    expected_reveal: &str,
    key_of: F,
) -> Result<T, VerifyError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> &Jwk,
{
    let jws = CompactJws::parse(signed_data)?;
    let payload: T =
        serde_json::from_slice(jws.payload()).map_err(|err| VerifyError::MalformedEncoding {
            message: format!("signed payload is not the expected JSON shape: {err}"),
        })?;

    let key = key_of(&payload);
    let computed = hashing::reveal(key).map_err(|err| VerifyError::MalformedEncoding {
        message: err.to_string(),
    })?;
    if computed != expected_reveal {
        return Err(VerifyError::RevealMismatch {
            expected: expected_reveal.to_string(),
            computed,
        });
    }

    jws.verify(key)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use k256::ecdsa::signature::Signer;
    use k256::ecdsa::SigningKey;
    use k256::elliptic_curve::sec1::ToEncodedPoint;
    use serde_json::json;

    use super::*;

    fn keypair(seed: u8) -> (SigningKey, serde_json::Value) {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        let jwk = json!({
            "kty": "EC",
            "crv": "secp256k1",
            "x": URL_SAFE_NO_PAD.encode(point.x().unwrap()),
            "y": URL_SAFE_NO_PAD.encode(point.y().unwrap()),
        });
        (key, jwk)
    }

    fn sign(key: &SigningKey, payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256K"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{header}.{payload}");
        let signature: k256::ecdsa::Signature = key.sign(signing_input.as_bytes());
        format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    #[test]
    fn update_verification_exposes_delta_hash() {
        let (key, jwk) = keypair(3);
        let reveal = hashing::reveal(&jwk).unwrap();
        let compact = sign(&key, &json!({"updateKey": jwk, "deltaHash": "DH"}));

        let payload = verify_update(&compact, &reveal).unwrap();
        assert_eq!(payload.delta_hash, "DH");
    }

    #[test]
    fn wrong_reveal_value_is_a_mismatch() {
        let (key, jwk) = keypair(3);
        let compact = sign(&key, &json!({"updateKey": jwk, "deltaHash": "DH"}));

        let err = verify_update(&compact, "someone-elses-reveal").unwrap_err();
        assert!(matches!(err, VerifyError::RevealMismatch { .. }));
    }

    #[test]
    fn signature_by_another_key_is_invalid() {
        let (_, jwk) = keypair(3);
        let (other_key, _) = keypair(4);
        let reveal = hashing::reveal(&jwk).unwrap();
        // Payload embeds key 3 but is signed with key 4.
        let compact = sign(&other_key, &json!({"updateKey": jwk, "deltaHash": "DH"}));

        assert_eq!(
            verify_update(&compact, &reveal),
            Err(VerifyError::SignatureInvalid)
        );
    }

    #[test]
    fn recover_payload_carries_commitment_and_origin() {
        let (key, jwk) = keypair(5);
        let reveal = hashing::reveal(&jwk).unwrap();
        let compact = sign(
            &key,
            &json!({
                "recoveryKey": jwk,
                "recoveryCommitment": "RC",
                "deltaHash": "DH",
                "anchorOrigin": "https://origin.example"
            }),
        );

        let payload = verify_recover(&compact, &reveal).unwrap();
        assert_eq!(payload.recovery_commitment, "RC");
        assert_eq!(payload.anchor_origin.as_deref(), Some("https://origin.example"));
    }

    #[test]
    fn deactivate_payload_names_the_did() {
        let (key, jwk) = keypair(6);
        let reveal = hashing::reveal(&jwk).unwrap();
        let compact = sign(&key, &json!({"didSuffix": "EiA-target", "recoveryKey": jwk}));

        let payload = verify_deactivate(&compact, &reveal).unwrap();
        assert_eq!(payload.did_suffix, "EiA-target");
    }

    #[test]
    fn garbage_signed_data_is_malformed() {
        let err = verify_update("signed-data", "reveal").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedEncoding { .. }));
    }

    #[test]
    fn wrong_payload_shape_is_malformed() {
        let (key, _) = keypair(7);
        let compact = sign(&key, &json!({"unexpected": true}));
        let err = verify_update(&compact, "reveal").unwrap_err();
        assert!(matches!(err, VerifyError::MalformedEncoding { .. }));
    }
}
