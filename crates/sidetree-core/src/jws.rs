//! Compact JWS parsing and verification.
//!
//! Operation proofs travel as compact-serialization JWS strings signed by
//! the key embedded in their own payload. Verification therefore never
//! consults a key registry: the payload names the key, the reveal-value
//! check binds that key to a previously published commitment, and the
//! signature check binds the payload to the key.
//!
//! Supported algorithms are `ES256K` (secp256k1, the key type anchored
//! batches carry in practice) and `EdDSA` (Ed25519). Anything else is
//! recognized and rejected as [`VerifyError::UnsupportedAlgorithm`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

/// A JSON Web Key as carried inside signed-data payloads.
///
/// Only the members needed for verification are typed; all other members
/// are preserved in `extra` so that the key re-serializes to the exact
/// object the signer hashed when deriving its reveal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, e.g. `EC` or `OKP`.
    pub kty: String,
    /// Curve name for EC/OKP keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// X coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Y coordinate (base64url), absent for OKP keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Any further members (`kid`, `alg`, ...), preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The protected header of a compact JWS.
#[derive(Debug, Clone, Deserialize)]
struct ProtectedHeader {
    alg: String,
}

/// A parsed compact JWS: protected header, payload, and signature.
#[derive(Debug, Clone)]
pub struct CompactJws {
    alg: String,
    signing_input: String,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

fn malformed(message: impl Into<String>) -> VerifyError {
    VerifyError::MalformedEncoding {
        message: message.into(),
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, VerifyError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|err| malformed(format!("JWS {what} is not base64url: {err}")))
}

impl CompactJws {
    /// Parses the three-segment compact serialization.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MalformedEncoding`] if the string is not of
    /// the form `<header>.<payload>.<signature>` with base64url segments
    /// and a JSON protected header carrying `alg`.
    pub fn parse(compact: &str) -> Result<Self, VerifyError> {
        let mut segments = compact.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(malformed("compact JWS must have exactly three segments"));
        };

        let header_bytes = decode_segment(header, "protected header")?;
        let parsed: ProtectedHeader = serde_json::from_slice(&header_bytes)
            .map_err(|err| malformed(format!("JWS protected header is not valid JSON: {err}")))?;

        Ok(Self {
            alg: parsed.alg,
            signing_input: format!("{header}.{payload}"),
            payload: decode_segment(payload, "payload")?,
            signature: decode_segment(signature, "signature")?,
        })
    }

    /// The decoded payload bytes.
    ///
    /// The payload is available before verification so that the embedded
    /// key can be extracted; callers must not trust it until
    /// [`CompactJws::verify`] has passed.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The `alg` value of the protected header.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.alg
    }

    /// Verifies the signature over the signing input using `key`.
    ///
    /// # Errors
    ///
    /// - [`VerifyError::UnsupportedAlgorithm`] for algorithms other than
    ///   `ES256K` and `EdDSA`
    /// - [`VerifyError::MalformedEncoding`] if the key material does not
    ///   match the algorithm's curve or does not decode
    /// - [`VerifyError::SignatureInvalid`] if the signature does not verify
    pub fn verify(&self, key: &Jwk) -> Result<(), VerifyError> {
        match self.alg.as_str() {
            "ES256K" => self.verify_es256k(key),
            "EdDSA" => self.verify_eddsa(key),
            other => Err(VerifyError::UnsupportedAlgorithm { alg: other.into() }),
        }
    }

    fn verify_es256k(&self, key: &Jwk) -> Result<(), VerifyError> {
        use k256::ecdsa::signature::Verifier;
        use k256::ecdsa::{Signature, VerifyingKey};

        if key.crv.as_deref() != Some("secp256k1") {
            return Err(malformed(format!(
                "ES256K requires a secp256k1 key, got curve {:?}",
                key.crv
            )));
        }
        let x = decode_coordinate(key.x.as_deref(), "x")?;
        let y = decode_coordinate(key.y.as_deref(), "y")?;

        let mut sec1 = Vec::with_capacity(65);
        sec1.push(0x04);
        sec1.extend_from_slice(&x);
        sec1.extend_from_slice(&y);
        let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|err| malformed(format!("key coordinates are not a curve point: {err}")))?;

        let signature = Signature::from_slice(&self.signature)
            .map_err(|err| malformed(format!("signature is not 64 raw bytes: {err}")))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        verifying_key
            .verify(self.signing_input.as_bytes(), &signature)
            .map_err(|_| VerifyError::SignatureInvalid)
    }

    fn verify_eddsa(&self, key: &Jwk) -> Result<(), VerifyError> {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        if key.crv.as_deref() != Some("Ed25519") {
            return Err(malformed(format!(
                "EdDSA requires an Ed25519 key, got curve {:?}",
                key.crv
            )));
        }
        let x = decode_coordinate(key.x.as_deref(), "x")?;

        let verifying_key = VerifyingKey::from_bytes(&x)
            .map_err(|err| malformed(format!("key is not a valid Ed25519 point: {err}")))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|err| malformed(format!("signature is not 64 raw bytes: {err}")))?;

        verifying_key
            .verify(self.signing_input.as_bytes(), &signature)
            .map_err(|_| VerifyError::SignatureInvalid)
    }
}

fn decode_coordinate(value: Option<&str>, name: &str) -> Result<[u8; 32], VerifyError> {
    let value = value.ok_or_else(|| malformed(format!("key is missing coordinate {name}")))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| malformed(format!("key coordinate {name} is not base64url: {err}")))?;
    bytes
        .try_into()
        .map_err(|_| malformed(format!("key coordinate {name} is not 32 bytes")))
}
