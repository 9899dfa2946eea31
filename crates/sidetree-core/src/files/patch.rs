//! The patch vocabulary.
//!
//! Deltas carry patches as raw JSON; this module gives them a typed shape
//! for downstream document-layer consumers. The resolver core itself never
//! applies a patch, it only pairs deltas with DIDs, so parsing here is a
//! convenience plus shape hygiene, not part of batch validation.
//!
//! `ietf-json-patch` is a recognized action that no layer applies; it is
//! surfaced as its own variant so consumers can reject or log it
//! deliberately rather than treating it as garbage.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest allowed key or service id, measured in base64url characters.
const MAX_ID_B64_LEN: usize = 50;

/// Error parsing a raw patch value into the typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PatchError {
    /// The patch object has no `action` string.
    #[error("patch has no action")]
    MissingAction,

    /// A known action's body does not have the required shape.
    #[error("{action} patch is malformed: {message}")]
    InvalidShape {
        /// The action whose body failed to parse.
        action: String,
        /// Decoder description of the failure.
        message: String,
    },

    /// A key or service id exceeds the protocol length cap.
    #[error("id {id:?} exceeds {MAX_ID_B64_LEN} base64url characters")]
    IdTooLong {
        /// The offending id.
        id: String,
    },
}

/// A public key added to a DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyEntry {
    /// Key id fragment.
    pub id: String,
    /// Verification method type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Controller DID, defaulted by the document layer when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// The key material as a JWK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<serde_json::Value>,
    /// The key material in multibase form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    /// Verification relationships the key serves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub purposes: Vec<String>,
}

/// A service endpoint added to a DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    /// Service id fragment.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint value, a URI or arbitrary object.
    pub service_endpoint: serde_json::Value,
}

/// One typed patch.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Replace the document's keys and services wholesale.
    Replace {
        /// The replacement document state.
        document: serde_json::Value,
    },
    /// Add public keys.
    AddPublicKeys {
        /// Keys to add.
        public_keys: Vec<PublicKeyEntry>,
    },
    /// Remove public keys by id.
    RemovePublicKeys {
        /// Ids to remove.
        ids: Vec<String>,
    },
    /// Add services.
    AddServices {
        /// Services to add.
        services: Vec<ServiceEntry>,
    },
    /// Remove services by id.
    RemoveServices {
        /// Ids to remove.
        ids: Vec<String>,
    },
    /// An RFC 6902 patch. Recognized, never applied.
    IetfJsonPatch {
        /// The raw patch operations.
        patches: serde_json::Value,
    },
    /// An action this vocabulary does not know. The document layer owns
    /// the rejection; the raw value is preserved.
    Unknown {
        /// The unrecognized action.
        action: String,
        /// The raw patch object.
        patch: serde_json::Value,
    },
}

fn body<T: serde::de::DeserializeOwned>(
    action: &str,
    value: &serde_json::Value,
) -> Result<T, PatchError> {
    serde_json::from_value(value.clone()).map_err(|err| PatchError::InvalidShape {
        action: action.to_string(),
        message: err.to_string(),
    })
}

fn check_id_length(id: &str) -> Result<(), PatchError> {
    if URL_SAFE_NO_PAD.encode(id).len() > MAX_ID_B64_LEN {
        return Err(PatchError::IdTooLong { id: id.to_string() });
    }
    Ok(())
}

#[derive(Deserialize)]
struct AddPublicKeysBody {
    #[serde(rename = "publicKeys")]
    public_keys: Vec<PublicKeyEntry>,
}

#[derive(Deserialize)]
struct AddServicesBody {
    services: Vec<ServiceEntry>,
}

#[derive(Deserialize)]
struct RemoveByIdsBody {
    ids: Vec<String>,
}

impl Patch {
    /// Parses one raw patch value.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError`] for a missing action, a malformed body of a
    /// known action, or an over-long key/service id. Unknown actions are
    /// not errors.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, PatchError> {
        let action = value
            .get("action")
            .and_then(serde_json::Value::as_str)
            .ok_or(PatchError::MissingAction)?;

        match action {
            "replace" => {
                let document = value
                    .get("document")
                    .cloned()
                    .ok_or_else(|| PatchError::InvalidShape {
                        action: action.into(),
                        message: "replace patch has no document".into(),
                    })?;
                Ok(Self::Replace { document })
            }
            "add-public-keys" => {
                let parsed: AddPublicKeysBody = body(action, value)?;
                for key in &parsed.public_keys {
                    check_id_length(&key.id)?;
                }
                Ok(Self::AddPublicKeys {
                    public_keys: parsed.public_keys,
                })
            }
            "remove-public-keys" => {
                let parsed: RemoveByIdsBody = body(action, value)?;
                Ok(Self::RemovePublicKeys { ids: parsed.ids })
            }
            "add-services" => {
                let parsed: AddServicesBody = body(action, value)?;
                for service in &parsed.services {
                    check_id_length(&service.id)?;
                }
                Ok(Self::AddServices {
                    services: parsed.services,
                })
            }
            "remove-services" => {
                let parsed: RemoveByIdsBody = body(action, value)?;
                Ok(Self::RemoveServices { ids: parsed.ids })
            }
            "ietf-json-patch" => Ok(Self::IetfJsonPatch {
                patches: value.get("patches").cloned().unwrap_or_default(),
            }),
            other => Ok(Self::Unknown {
                action: other.to_string(),
                patch: value.clone(),
            }),
        }
    }

    /// True for patch kinds the reference stack applies to documents.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::IetfJsonPatch { .. } | Self::Unknown { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_every_named_action() {
        let patches = [
            json!({"action": "replace", "document": {"publicKeys": []}}),
            json!({"action": "add-public-keys", "publicKeys": [
                {"id": "key-1", "type": "JsonWebKey2020", "publicKeyJwk": {"kty": "EC"}}
            ]}),
            json!({"action": "remove-public-keys", "ids": ["key-1"]}),
            json!({"action": "add-services", "services": [
                {"id": "svc-1", "type": "LinkedDomains", "serviceEndpoint": "https://example.com"}
            ]}),
            json!({"action": "remove-services", "ids": ["svc-1"]}),
        ];

        for raw in &patches {
            let patch = Patch::from_value(raw).unwrap();
            assert!(patch.is_applicable(), "{raw} should be applicable");
        }
    }

    #[test]
    fn ietf_json_patch_is_recognized_but_not_applicable() {
        let raw = json!({"action": "ietf-json-patch", "patches": [
            {"op": "remove", "path": "/service"}
        ]});
        let patch = Patch::from_value(&raw).unwrap();
        assert!(matches!(patch, Patch::IetfJsonPatch { .. }));
        assert!(!patch.is_applicable());
    }

    #[test]
    fn unknown_action_is_preserved() {
        let raw = json!({"action": "rotate-everything", "stuff": 1});
        let patch = Patch::from_value(&raw).unwrap();
        match patch {
            Patch::Unknown { action, patch } => {
                assert_eq!(action, "rotate-everything");
                assert_eq!(patch, raw);
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn missing_action_is_an_error() {
        assert_eq!(
            Patch::from_value(&json!({"document": {}})),
            Err(PatchError::MissingAction)
        );
    }

    #[test]
    fn overlong_key_id_is_rejected() {
        let long_id = "k".repeat(64);
        let raw = json!({"action": "add-public-keys", "publicKeys": [
            {"id": long_id, "publicKeyJwk": {"kty": "EC"}}
        ]});
        assert!(matches!(
            Patch::from_value(&raw),
            Err(PatchError::IdTooLong { .. })
        ));
    }

    #[test]
    fn malformed_known_action_is_an_error() {
        let raw = json!({"action": "remove-services", "ids": "not-a-list"});
        assert!(matches!(
            Patch::from_value(&raw),
            Err(PatchError::InvalidShape { .. })
        ));
    }
}
