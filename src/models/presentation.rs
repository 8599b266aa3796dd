// src/models/presentation.rs
//! Verifiable Presentation (VP) data model.

use crate::models::credential::{DisclosedFields, Pid, RegistryReceipt};
use p256::elliptic_curve::JwkEcKey;
use serde::{Deserialize, Serialize};

/// A presentation assembled fresh by the holder for one challenge.
///
/// # Fields
/// - `pid`: holder's privacy-preserving identifier
/// - `proof`: base64url ECDSA P-256 signature (`r || s`) over the challenge's canonical payload
/// - `sd_proof`: selective-disclosure commitment over `disclosed` and the receipt's credential hash
/// - `disclosed`: the attributes the holder reveals
/// - `receipt`: registry evidence, forwarded without inspection
/// - `public_key`: holder's P-256 public key as a JWK
///
/// # Wire Format
/// ```json
/// {
///   "pid": "pid:...",
///   "proof": "MEUCIQ...",
///   "sd_proof": "x2f...",
///   "disclosed": {"role": "bank_client"},
///   "receipt": {"cred_hash": "...", "attestation": "..."},
///   "public_key": {"kty": "EC", "crv": "P-256", "x": "...", "y": "..."}
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Presentation {
    pub pid: Pid,
    pub proof: String,
    pub sd_proof: String,
    #[serde(default)]
    pub disclosed: DisclosedFields,
    pub receipt: RegistryReceipt,
    pub public_key: JwkEcKey,
}

impl Presentation {
    /// The disclosed `role` attribute, if the holder revealed one as a string.
    pub fn disclosed_role(&self) -> Option<&str> {
        self.disclosed.get("role").and_then(|v| v.as_str())
    }
}
