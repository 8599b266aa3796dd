// src/models/credential.rs
//! Credential-side data model.
//!
//! Defines the privacy-preserving identifier, the disclosed attribute set,
//! the registry receipt a holder presents, and the status/policy the registry
//! answers with.

use crate::utils::crypto::{b64url_encode, hash_data};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Privacy-preserving identifier.
///
/// `pid:` followed by the base64url SHA-256 of a holder-controlled seed.
/// Deterministic for a seed, not invertible, and carries no credential
/// content.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    /// Textual prefix of every identifier
    pub const PREFIX: &'static str = "pid:";

    /// Derives the identifier for a secret seed.
    pub fn from_seed(seed: &[u8]) -> Self {
        Pid(format!("{}{}", Self::PREFIX, b64url_encode(&hash_data(seed))))
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Pid {
    fn from(value: String) -> Self {
        Pid(value)
    }
}

/// Attributes the holder chooses to reveal, keyed by attribute name.
///
/// Sorted by key so both sides of the wire commit over identical bytes.
pub type DisclosedFields = BTreeMap<String, serde_json::Value>;

/// Opaque evidence the registry can check.
///
/// The verifier never looks inside `attestation`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistryReceipt {
    /// Hash identifying the credential at the registry
    pub cred_hash: String,
    /// Registry-specific attestation bytes, encoded as text
    pub attestation: String,
}

/// Credential status as reported by the registry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Valid,
    Revoked,
    Expired,
    Unknown,
}

/// Role and scopes a credential authorizes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub role: String,
    pub scopes: Vec<String>,
}

/// Registry answer for a receipt.
///
/// Wire format: `{"status": "valid", "policy": {...}, "pid": "pid:..", "holderJkt": "..", "verifiedAt": 1731600000000, "error": null}`
///
/// `pid` and `holderJkt` name the holder the credential was enrolled for.
/// Registries that know them must return them; the verifier rejects a
/// presentation signed by any other key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: CredentialStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<Pid>,

    /// RFC 7638 thumbprint of the enrolled holder key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_jkt: Option<String>,

    /// Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    /// A `valid` answer carrying the authorized policy.
    pub fn valid(policy: Policy) -> Self {
        Self {
            status: CredentialStatus::Valid,
            policy: Some(policy),
            pid: None,
            holder_jkt: None,
            verified_at: Some(chrono::Utc::now().timestamp_millis()),
            error: None,
        }
    }

    /// A non-valid answer with no policy.
    pub fn with_status(status: CredentialStatus) -> Self {
        Self {
            status,
            policy: None,
            pid: None,
            holder_jkt: None,
            verified_at: Some(chrono::Utc::now().timestamp_millis()),
            error: None,
        }
    }

    /// Names the holder the credential is enrolled for.
    pub fn for_holder(mut self, pid: Pid, holder_jkt: impl Into<String>) -> Self {
        self.pid = Some(pid);
        self.holder_jkt = Some(holder_jkt.into());
        self
    }

    /// `unknown` with a reason. Used when the registry cannot attest,
    /// including transport failures.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            status: CredentialStatus::Unknown,
            policy: None,
            pid: None,
            holder_jkt: None,
            verified_at: None,
            error: Some(reason.into()),
        }
    }
}
