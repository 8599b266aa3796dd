// src/models/token.rs
//! Capability token claim set.

use serde::{Deserialize, Serialize};

/// Proof-of-possession confirmation (`cnf`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// RFC 7638 thumbprint of the holder's public key
    pub jkt: String,
}

/// Claims carried by a capability token.
///
/// Standard JWT registered names are used on the wire:
/// `iss, sub, aud, scope[], iat, exp, jti` and optionally `cnf.jkt`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CapabilityClaims {
    /// Token service identity
    pub iss: String,
    /// Holder's privacy-preserving identifier
    pub sub: String,
    /// Relying party the challenge was issued for
    pub aud: String,
    /// Granted scopes, never wider than the registry policy
    pub scope: Vec<String>,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnf: Option<Confirmation>,
}

impl CapabilityClaims {
    /// Whether `required` is granted, either directly or through `*`.
    pub fn has_scope(&self, required: &str) -> bool {
        self.scope.iter().any(|s| s == required || s == "*")
    }

    /// Whether the token is bound to the key with thumbprint `jkt`.
    ///
    /// Unbound tokens are bearer tokens and bind to nothing.
    pub fn is_bound_to(&self, jkt: &str) -> bool {
        self.cnf.as_ref().map(|c| c.jkt == jkt).unwrap_or(false)
    }

    /// Seconds until expiry measured from `now` (Unix seconds), never negative.
    pub fn expires_in(&self, now: i64) -> i64 {
        (self.exp - now).max(0)
    }
}
