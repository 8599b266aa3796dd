// src/models/challenge.rs
//! Challenge data model.
//!
//! A challenge is a server-issued nonce bound to an audience and an expiry.
//! The holder signs its canonical payload to prove liveness; the authority
//! hands each challenge out for consumption exactly once.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single-use nonce bound to an audience and an expiry.
///
/// Wire format matches `POST /challenge`:
/// `{"nonce": "...", "aud": "agenticdid.io", "exp": 1731600000000}`
///
/// `exp` is a Unix timestamp in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Opaque random token, base64url of 32 CSPRNG bytes
    pub nonce: String,

    /// Relying party the signature is bound to
    #[serde(rename = "aud")]
    pub audience: String,

    /// Expiry in Unix milliseconds
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl Challenge {
    /// Returns `true` once `now_ms` has reached `expires_at`.
    ///
    /// A challenge is usable strictly before its expiry instant.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Expiry check against the wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}
