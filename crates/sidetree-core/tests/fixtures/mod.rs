//! Shared builders for the batch pipeline tests.
//!
//! Keys are deterministic secp256k1 keypairs; signed data is real compact
//! JWS material so the tests exercise the same verification path as
//! production batches.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use k256::ecdsa::signature::Signer;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde_json::{json, Value};

use sidetree_core::hashing;

/// A deterministic ES256K keypair with its public JWK.
pub struct TestKey {
    signing: SigningKey,
    pub jwk: Value,
}

impl TestKey {
    pub fn new(seed: u8) -> Self {
        let signing = SigningKey::from_slice(&[seed; 32]).expect("non-zero seed");
        let point = signing.verifying_key().to_encoded_point(false);
        let jwk = json!({
            "kty": "EC",
            "crv": "secp256k1",
            "x": URL_SAFE_NO_PAD.encode(point.x().expect("uncompressed point")),
            "y": URL_SAFE_NO_PAD.encode(point.y().expect("uncompressed point")),
        });
        Self { signing, jwk }
    }

    /// The reveal value of this key.
    pub fn reveal(&self) -> String {
        hashing::reveal(&self.jwk).expect("jwk canonicalizes")
    }

    /// The commitment to this key.
    pub fn commitment(&self) -> String {
        hashing::commitment(&self.jwk).expect("jwk canonicalizes")
    }

    /// Signs a payload as a compact ES256K JWS.
    pub fn sign(&self, payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256K"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{header}.{payload}");
        let signature: k256::ecdsa::Signature = self.signing.sign(signing_input.as_bytes());
        format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }
}

/// Suffix data for a create operation.
pub fn suffix_data(delta_hash: &str, recovery_commitment: &str) -> Value {
    json!({
        "deltaHash": delta_hash,
        "recoveryCommitment": recovery_commitment,
    })
}

/// The DID suffix a create with this suffix data resolves to.
pub fn computed_suffix(suffix_data: &Value) -> String {
    hashing::hash_value(suffix_data).expect("suffix data canonicalizes")
}

/// A delta with one replace patch and the given update commitment.
pub fn delta(update_commitment: &str) -> Value {
    json!({
        "patches": [{
            "action": "replace",
            "document": {"publicKeys": []}
        }],
        "updateCommitment": update_commitment,
    })
}

/// The hash a signed payload must commit to for this delta.
pub fn delta_hash(delta: &Value) -> String {
    hashing::hash_value(delta).expect("delta canonicalizes")
}

/// Serializes a file value to the bytes a CAS fetch would return.
pub fn file_bytes(value: &Value) -> Vec<u8> {
    value.to_string().into_bytes()
}
