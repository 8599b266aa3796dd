// src/wallet/presentation_builder.rs
//! Verifiable Presentation assembly on the holder side.
//!
//! A presentation is built fresh for every challenge: the holder signs the
//! challenge payload, commits to the attributes it reveals, and attaches the
//! registry receipt for its credential.

use crate::error::Result;
use crate::models::challenge::Challenge;
use crate::models::credential::{DisclosedFields, RegistryReceipt};
use crate::models::presentation::Presentation;
use crate::utils::crypto::{b64url_encode, hash_data};
use crate::wallet::agent_credential::AgentCredential;
use crate::zkp::selective_disclosure::SelectiveDisclosure;
use chrono::Utc;

/// Builds a presentation answering `challenge`.
///
/// # Arguments
/// * `credential` - Holder credential and keys
/// * `challenge` - Challenge returned by `POST /challenge`
/// * `disclosed` - Attributes to reveal
/// * `scheme` - Commitment scheme the verifier expects
///
/// # Returns
/// A presentation whose `proof` covers the challenge's canonical payload and
/// whose `sd_proof` commits to `disclosed` plus the credential hash.
pub fn build_presentation(
    credential: &AgentCredential,
    challenge: &Challenge,
    disclosed: DisclosedFields,
    scheme: &dyn SelectiveDisclosure,
) -> Result<Presentation> {
    let sd_proof = scheme.build_proof(&disclosed, &credential.credential_hash)?;

    Ok(Presentation {
        pid: credential.pid.clone(),
        proof: credential.keys.sign_challenge(challenge),
        sd_proof,
        disclosed,
        receipt: mock_receipt(&credential.credential_hash),
        public_key: credential.keys.public_jwk(),
    })
}

/// Receipt stand-in for registries that only check the credential hash.
///
/// The attestation is `base64url(SHA-256("registry-receipt:{hash}:{ms}"))`.
pub fn mock_receipt(credential_hash: &str) -> RegistryReceipt {
    let stamp = Utc::now().timestamp_millis();
    let attestation = hash_data(format!("registry-receipt:{}:{}", credential_hash, stamp).as_bytes());
    RegistryReceipt {
        cred_hash: credential_hash.to_string(),
        attestation: b64url_encode(&attestation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::signature::{canonical_payload, decode_signature, verify, verifying_key_from_jwk};
    use crate::zkp::selective_disclosure::HashCommitment;
    use serde_json::json;

    #[test]
    fn test_presentation_is_self_consistent() {
        let credential = AgentCredential::generate(b"seed", "FINANCIAL_ACCOUNT", "issuer", None).unwrap();
        let challenge = Challenge {
            nonce: "n1".into(),
            audience: "agenticdid.io".into(),
            expires_at: 1_000,
        };
        let mut disclosed = DisclosedFields::new();
        disclosed.insert("role".into(), json!("bank_client"));

        let vp = build_presentation(&credential, &challenge, disclosed.clone(), &HashCommitment).unwrap();

        let key = verifying_key_from_jwk(&vp.public_key).unwrap();
        let signature = decode_signature(&vp.proof).unwrap();
        assert!(verify(&key, &canonical_payload(&challenge), &signature));
        assert!(HashCommitment.verify_proof(&disclosed, &credential.credential_hash, &vp.sd_proof));
        assert_eq!(vp.receipt.cred_hash, credential.credential_hash);
        assert_eq!(vp.disclosed_role(), Some("bank_client"));

        // Serializes with the documented field names
        let wire = serde_json::to_value(&vp).unwrap();
        for field in ["pid", "proof", "sd_proof", "disclosed", "receipt", "public_key"] {
            assert!(wire.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(wire["public_key"]["kty"], "EC");
    }

    #[test]
    fn test_mock_receipt() {
        let receipt = mock_receipt("cred-1");
        assert_eq!(receipt.cred_hash, "cred-1");
        assert_eq!(receipt.attestation.len(), 43);
    }
}
