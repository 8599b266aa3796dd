// src/services/verifier.rs
//! Presentation verification service.
//!
//! Runs one presentation attempt through a fixed sequence of checks:
//!
//! ```text
//! Received -> ChallengeResolved -> SignatureChecked -> ProofChecked -> RegistryChecked -> Accepted
//! ```
//!
//! Each stage only proceeds on success. The first failure rejects the whole
//! attempt with a specific [`AuthError`]; nothing is retried and a consumed
//! challenge is never restored.
//!
//! The signature proves possession of the key in the presentation. When the
//! registry names the enrolled holder, that key and the presented pid must
//! match it, otherwise anyone who has seen a credential hash could present
//! it under their own key.

use crate::contracts::credential_registry::CredentialRegistry;
use crate::error::{AuthError, Result};
use crate::models::credential::{CredentialStatus, Pid};
use crate::models::presentation::Presentation;
use crate::services::challenge_authority::ChallengeAuthority;
use crate::utils::signature::{
    canonical_payload, decode_signature, jwk_thumbprint, verify, verifying_key_from_jwk,
};
use crate::zkp::selective_disclosure::SelectiveDisclosure;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Verification stages, used for transition logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    ChallengeResolved,
    SignatureChecked,
    ProofChecked,
    RegistryChecked,
    Accepted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::ChallengeResolved => "challenge_resolved",
            Stage::SignatureChecked => "signature_checked",
            Stage::ProofChecked => "proof_checked",
            Stage::RegistryChecked => "registry_checked",
            Stage::Accepted => "accepted",
        };
        f.write_str(name)
    }
}

/// Outcome of an accepted presentation, ready for token issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPresentation {
    pub pid: Pid,
    pub role: String,
    /// Exactly the registry policy's scopes
    pub scopes: Vec<String>,
    /// Audience of the consumed challenge
    pub audience: String,
    /// Thumbprint of the holder key, when proof-of-possession binding is on
    pub pop_thumbprint: Option<String>,
}

/// Verifies presentations against stored challenges and the registry.
pub struct PresentationVerifier {
    challenges: Arc<ChallengeAuthority>,
    disclosure: Arc<dyn SelectiveDisclosure>,
    registry: Arc<dyn CredentialRegistry>,
    registry_timeout: Duration,
    bind_proof_of_possession: bool,
}

impl PresentationVerifier {
    /// Constructs a new verifier.
    ///
    /// # Arguments
    /// * `challenges` - Authority holding outstanding challenges
    /// * `disclosure` - Commitment scheme used for `sd_proof`
    /// * `registry` - Credential status oracle
    /// * `registry_timeout` - Upper bound on the registry call
    /// * `bind_proof_of_possession` - Whether accepted presentations carry the
    ///   holder key thumbprint forward
    pub fn new(
        challenges: Arc<ChallengeAuthority>,
        disclosure: Arc<dyn SelectiveDisclosure>,
        registry: Arc<dyn CredentialRegistry>,
        registry_timeout: Duration,
        bind_proof_of_possession: bool,
    ) -> Self {
        Self {
            challenges,
            disclosure,
            registry,
            registry_timeout,
            bind_proof_of_possession,
        }
    }

    /// Verifies `vp` against the challenge identified by `nonce`.
    ///
    /// # Errors
    /// - `InvalidChallenge`: nonce unknown, already used, or expired
    /// - `SignatureInvalid`: holder key or signature undecodable, mismatch,
    ///   or key/pid other than the enrolled holder's
    /// - `ProofInconsistent`: commitment mismatch, or disclosed role absent
    ///   or different from the registry policy
    /// - `CredentialRevoked` / `CredentialExpired` / `CredentialUnknown`:
    ///   registry verdicts
    /// - `RegistryUnavailable`: registry call timed out
    pub async fn verify(&self, vp: &Presentation, nonce: &str) -> Result<VerifiedPresentation> {
        let mut stage = Stage::Received;
        log::debug!("presentation from {}: {}", vp.pid, stage);

        let result = self.run(vp, nonce, &mut stage).await;
        match &result {
            Ok(_) => log::info!("presentation from {} accepted", vp.pid),
            Err(e) => log::info!("presentation from {} rejected after {}: {}", vp.pid, stage, e),
        }
        result
    }

    async fn run(
        &self,
        vp: &Presentation,
        nonce: &str,
        stage: &mut Stage,
    ) -> Result<VerifiedPresentation> {
        let challenge = self.challenges.consume(nonce).await?;
        advance(stage, Stage::ChallengeResolved, &vp.pid);

        let holder_key = verifying_key_from_jwk(&vp.public_key)?;
        let signature = decode_signature(&vp.proof)
            .ok_or_else(|| AuthError::SignatureInvalid("undecodable signature".into()))?;
        if !verify(&holder_key, &canonical_payload(&challenge), &signature) {
            return Err(AuthError::SignatureInvalid(
                "signature does not match challenge".into(),
            ));
        }
        advance(stage, Stage::SignatureChecked, &vp.pid);

        if !self
            .disclosure
            .verify_proof(&vp.disclosed, &vp.receipt.cred_hash, &vp.sd_proof)
        {
            return Err(AuthError::ProofInconsistent(
                "commitment does not match disclosed fields".into(),
            ));
        }
        advance(stage, Stage::ProofChecked, &vp.pid);

        let verdict = tokio::time::timeout(
            self.registry_timeout,
            self.registry.verify_receipt(&vp.receipt),
        )
        .await
        .map_err(|_| {
            AuthError::RegistryUnavailable(format!(
                "no answer within {}ms",
                self.registry_timeout.as_millis()
            ))
        })?;

        let policy = match verdict.status {
            CredentialStatus::Valid => verdict.policy.ok_or_else(|| {
                AuthError::CredentialUnknown("valid status without policy".into())
            })?,
            CredentialStatus::Revoked => return Err(AuthError::CredentialRevoked),
            CredentialStatus::Expired => return Err(AuthError::CredentialExpired),
            CredentialStatus::Unknown => {
                return Err(AuthError::CredentialUnknown(
                    verdict.error.unwrap_or_else(|| "registry could not attest".into()),
                ))
            }
        };

        if let Some(enrolled) = &verdict.pid {
            if *enrolled != vp.pid {
                return Err(AuthError::SignatureInvalid(
                    "pid differs from enrolled holder".into(),
                ));
            }
        }
        let presented_jkt = jwk_thumbprint(&vp.public_key)?;
        if let Some(enrolled) = &verdict.holder_jkt {
            if *enrolled != presented_jkt {
                return Err(AuthError::SignatureInvalid(
                    "key is not the enrolled holder key".into(),
                ));
            }
        }
        advance(stage, Stage::RegistryChecked, &vp.pid);

        let disclosed_role = vp.disclosed_role();
        if disclosed_role != Some(policy.role.as_str()) {
            return Err(AuthError::ProofInconsistent(format!(
                "disclosed role {:?} differs from policy role '{}'",
                disclosed_role, policy.role
            )));
        }

        let pop_thumbprint = self.bind_proof_of_possession.then_some(presented_jkt);
        advance(stage, Stage::Accepted, &vp.pid);

        Ok(VerifiedPresentation {
            pid: vp.pid.clone(),
            role: policy.role,
            scopes: policy.scopes,
            audience: challenge.audience,
            pop_thumbprint,
        })
    }
}

fn advance(stage: &mut Stage, next: Stage, pid: &Pid) {
    log::debug!("presentation from {}: {} -> {}", pid, stage, next);
    *stage = next;
}
