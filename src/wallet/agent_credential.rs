// src/wallet/agent_credential.rs
//! Holder-owned agent credential.

use crate::contracts::credential_registry::EnrollmentRecord;
use crate::error::Result;
use crate::models::credential::Pid;
use crate::utils::crypto::{b64url_encode, hash_data};
use crate::utils::serialization::canonical_bytes;
use crate::utils::signature::jwk_thumbprint;
use crate::wallet::key_management::KeyManager;
use chrono::Utc;
use serde::Serialize;

/// A credential as held by the agent.
///
/// The signing key stays inside `keys`; only the pid, the credential hash and
/// whatever the holder chooses to disclose ever leave the wallet.
#[derive(Clone)]
pub struct AgentCredential {
    pub pid: Pid,
    pub keys: KeyManager,
    pub credential_hash: String,
    pub credential_type: String,
    pub issuer: String,
    /// Unix milliseconds; `None` never expires
    pub expires_at: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    credential_type: &'a str,
    expires_at: Option<i64>,
    holder_key: &'a str,
    issuer: &'a str,
    pid: &'a str,
}

impl AgentCredential {
    /// Creates a credential held under `keys`.
    ///
    /// # Arguments
    /// * `seed` - Holder secret the pid is derived from
    /// * `keys` - Holder signing key
    /// * `credential_type` - e.g. `FINANCIAL_ACCOUNT`
    /// * `issuer` - Issuer DID
    /// * `expires_at` - Optional expiry, Unix milliseconds
    ///
    /// # Errors
    /// Fails only if the credential body cannot be serialized.
    pub fn new(
        seed: &[u8],
        keys: KeyManager,
        credential_type: &str,
        issuer: &str,
        expires_at: Option<i64>,
    ) -> Result<Self> {
        let pid = Pid::from_seed(seed);
        let holder_key = jwk_thumbprint(&keys.public_jwk())?;

        let body = canonical_bytes(&HashInput {
            credential_type,
            expires_at,
            holder_key: &holder_key,
            issuer,
            pid: pid.as_str(),
        })?;

        Ok(Self {
            pid,
            keys,
            credential_hash: b64url_encode(&hash_data(&body)),
            credential_type: credential_type.to_string(),
            issuer: issuer.to_string(),
            expires_at,
        })
    }

    /// Credential whose key is derived from `seed` as well, so it can be
    /// rebuilt on every run.
    pub fn from_seed(
        seed: &[u8],
        credential_type: &str,
        issuer: &str,
        expires_at: Option<i64>,
    ) -> Result<Self> {
        Self::new(seed, KeyManager::from_seed(seed)?, credential_type, issuer, expires_at)
    }

    /// Credential with a throwaway key.
    #[cfg(test)]
    pub fn generate(
        seed: &[u8],
        credential_type: &str,
        issuer: &str,
        expires_at: Option<i64>,
    ) -> Result<Self> {
        Self::new(seed, KeyManager::new(), credential_type, issuer, expires_at)
    }

    /// Registry entry binding this credential to its holder pid and key.
    pub fn enrollment_record(&self, role: &str, scopes: &[&str]) -> Result<EnrollmentRecord> {
        Ok(EnrollmentRecord {
            credential_hash: self.credential_hash.clone(),
            pid: self.pid.clone(),
            holder_jkt: jwk_thumbprint(&self.keys.public_jwk())?,
            issuer: self.issuer.clone(),
            credential_type: self.credential_type.clone(),
            role: role.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expires_at: self.expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Utc::now().timestamp_millis() >= exp)
            .unwrap_or(false)
    }
}
