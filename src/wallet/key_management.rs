// src/wallet/key_management.rs
//! Holder-side key management.
//!
//! Provides generation and use of the holder's signing key:
//! - ECDSA P-256 signatures over challenge payloads
//! - Public key export as JWK
//!
//! Uses the following cryptographic primitives:
//! - NIST P-256 curve (via `p256` crate)
//! - SHA-256 message digest (inside `p256::ecdsa`)
//! - Operating system RNG (`rand::rngs::OsRng`)

use crate::error::{AuthError, Result};
use crate::models::challenge::Challenge;
use crate::utils::crypto::hash_data;
use crate::utils::signature::{canonical_payload, encode_signature, public_jwk, sign};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::JwkEcKey;
use rand::rngs::OsRng;

/// Holder key pair.
///
/// # Security Notes
/// - The signing key is private to this struct and never serialized
/// - Signatures are deterministic (RFC 6979)
#[derive(Clone)]
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    signing_key: SigningKey,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh P-256 key.
    pub fn new() -> Self {
        KeyManager {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Restores a key from its 32-byte scalar.
    ///
    /// # Errors
    /// `AuthError::MalformedRequest` if the bytes are not a valid scalar.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|_| AuthError::MalformedRequest("invalid P-256 secret key".into()))?;
        Ok(KeyManager { signing_key })
    }

    /// Derives a stable key from a holder seed.
    ///
    /// The secret scalar is SHA-256 over a domain tag and the seed, so the same
    /// seed always yields the same key and thumbprint.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let mut input = b"did-gatekeeper/holder-key:".to_vec();
        input.extend_from_slice(seed);
        Self::from_secret_bytes(&hash_data(&input))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Public key as a JWK, for the presentation's `public_key` field.
    pub fn public_jwk(&self) -> JwkEcKey {
        public_jwk(self.verifying_key())
    }

    /// Signs raw bytes.
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        sign(&self.signing_key, message)
    }

    /// Signs a challenge's canonical payload and returns the wire encoding.
    pub fn sign_challenge(&self, challenge: &Challenge) -> String {
        encode_signature(&self.sign_message(&canonical_payload(challenge)))
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}
