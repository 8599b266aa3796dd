// src/zkp/selective_disclosure.rs
//! # Selective Disclosure Commitments
//!
//! A holder reveals a subset of credential attributes and commits to them
//! together with the credential hash the registry knows. The verifier
//! recomputes the commitment to confirm the revealed attributes belong to
//! that credential.
//!
//! ## Schemes
//! - [`HashCommitment`]: one-way SHA-256 commitment over canonical JSON.
//!
//! The pipeline only sees the [`SelectiveDisclosure`] trait, so a real
//! zero-knowledge scheme slots in behind the same two calls.
//!
//! ## Security Considerations
//! - The hash scheme hides nothing from a verifier that can guess the
//!   disclosed values; it only binds them to the credential hash.
//! - Commitments are compared in constant time.

use crate::error::Result;
use crate::models::credential::DisclosedFields;
use crate::utils::crypto::{b64url_encode, constant_time_eq, hash_data};
use crate::utils::serialization::canonical_bytes;
use serde::Serialize;

/// Commitment scheme over disclosed attributes and a credential hash.
pub trait SelectiveDisclosure: Send + Sync {
    /// Produces the commitment a holder places in `sd_proof`.
    ///
    /// # Errors
    /// Fails only if the disclosed values cannot be serialized.
    fn build_proof(&self, disclosed: &DisclosedFields, credential_hash: &str) -> Result<String>;

    /// Checks `commitment` against the disclosed attributes.
    ///
    /// Returns `false` for any mismatch or unusable input.
    fn verify_proof(
        &self,
        disclosed: &DisclosedFields,
        credential_hash: &str,
        commitment: &str,
    ) -> bool;
}

/// Commitment body. `disclosed` serializes before `credentialHash`; existing
/// holder SDKs hash exactly this layout.
#[derive(Serialize)]
struct CommitmentInput<'a> {
    disclosed: &'a DisclosedFields,
    #[serde(rename = "credentialHash")]
    credential_hash: &'a str,
}

/// `base64url(SHA-256({"disclosed": {..}, "credentialHash": ..}))`
#[derive(Debug, Default, Clone, Copy)]
pub struct HashCommitment;

impl SelectiveDisclosure for HashCommitment {
    fn build_proof(&self, disclosed: &DisclosedFields, credential_hash: &str) -> Result<String> {
        let bytes = canonical_bytes(&CommitmentInput {
            disclosed,
            credential_hash,
        })?;
        Ok(b64url_encode(&hash_data(&bytes)))
    }

    fn verify_proof(
        &self,
        disclosed: &DisclosedFields,
        credential_hash: &str,
        commitment: &str,
    ) -> bool {
        match self.build_proof(disclosed, credential_hash) {
            Ok(expected) => constant_time_eq(expected.as_bytes(), commitment.as_bytes()),
            Err(e) => {
                log::warn!("could not recompute disclosure commitment: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn disclosed(role: &str) -> DisclosedFields {
        let mut fields = DisclosedFields::new();
        fields.insert("role".into(), json!(role));
        fields.insert("age_over_18".into(), json!(true));
        fields
    }

    #[test]
    fn test_commitment_verifies() {
        let scheme = HashCommitment;
        let proof = scheme.build_proof(&disclosed("bank_client"), "cred-1").unwrap();
        assert!(scheme.verify_proof(&disclosed("bank_client"), "cred-1", &proof));
    }

    #[test]
    fn test_commitment_binds_fields_and_hash() {
        let scheme = HashCommitment;
        let proof = scheme.build_proof(&disclosed("bank_client"), "cred-1").unwrap();

        assert!(!scheme.verify_proof(&disclosed("admin"), "cred-1", &proof));
        assert!(!scheme.verify_proof(&disclosed("bank_client"), "cred-2", &proof));
        assert!(!scheme.verify_proof(&DisclosedFields::new(), "cred-1", &proof));
        assert!(!scheme.verify_proof(&disclosed("bank_client"), "cred-1", "garbage"));
    }

    #[test]
    fn test_commitment_matches_documented_layout() {
        let expected_input = r#"{"disclosed":{"age_over_18":true,"role":"bank_client"},"credentialHash":"cred-1"}"#;
        let expected = b64url_encode(&hash_data(expected_input.as_bytes()));
        let proof = HashCommitment
            .build_proof(&disclosed("bank_client"), "cred-1")
            .unwrap();
        assert_eq!(proof, expected);

        // Hash first is a different commitment
        let swapped = r#"{"credentialHash":"cred-1","disclosed":{"age_over_18":true,"role":"bank_client"}}"#;
        assert_ne!(proof, b64url_encode(&hash_data(swapped.as_bytes())));
    }
}
