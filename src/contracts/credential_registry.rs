// src/contracts/credential_registry.rs
//! Credential Registry client contract.
//!
//! The registry is an oracle: given a receipt `{credentialHash, attestation}`
//! it answers whether the credential is currently valid and which policy
//! (role, scopes) it authorizes. Implementations never guess. Anything they
//! cannot attest to comes back as `unknown` with an `error` string.
//!
//! Two implementations are provided:
//! - [`HttpCredentialRegistry`]: remote registry over HTTP
//! - [`LocalCredentialRegistry`]: in-process reference oracle with
//!   enrollments, revocation and issuer allow-list checks, optionally seeded
//!   from a registry file
//!
//! Enrolled credentials are bound to their holder: a `valid` answer names the
//! holder's pid and key thumbprint.

use crate::contracts::issuer_policy;
use crate::error::{AuthError, Result};
use crate::models::credential::{
    CredentialStatus, Pid, Policy, RegistryReceipt, VerificationResult,
};
use crate::utils::settings::Settings;
use async_trait::async_trait;
use chrono::Utc;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Registry interface consumed by the presentation verifier.
#[async_trait]
pub trait CredentialRegistry: Send + Sync {
    /// Reports the current status of the credential behind `receipt`.
    ///
    /// Transport failures must surface as `CredentialStatus::Unknown`.
    async fn verify_receipt(&self, receipt: &RegistryReceipt) -> VerificationResult;
}

/// Outbound request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReceiptRequest<'a> {
    credential_hash: &'a str,
    attestation: &'a str,
}

/// Remote registry reached with `POST {base_url}/verify`.
pub struct HttpCredentialRegistry {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCredentialRegistry {
    /// Creates a client with a per-request `timeout`.
    ///
    /// # Arguments
    /// * `base_url` - Registry root, e.g. `http://localhost:8788`
    /// * `timeout` - Upper bound on one verification round trip
    ///
    /// # Errors
    /// `AuthError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Config(format!("registry client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/verify", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl CredentialRegistry for HttpCredentialRegistry {
    async fn verify_receipt(&self, receipt: &RegistryReceipt) -> VerificationResult {
        let body = VerifyReceiptRequest {
            credential_hash: &receipt.cred_hash,
            attestation: &receipt.attestation,
        };

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("registry request to {} failed: {}", self.endpoint, e);
                return VerificationResult::unknown(format!("registry unreachable: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("registry answered HTTP {}", status);
            return VerificationResult::unknown(format!("registry returned HTTP {}", status));
        }

        match response.json::<VerificationResult>().await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("registry response undecodable: {}", e);
                VerificationResult::unknown("registry response undecodable")
            }
        }
    }
}

/// A credential known to the local registry.
#[derive(Debug, Clone)]
pub struct Enrollment {
    /// Holder the credential was issued to
    pub pid: Pid,
    /// RFC 7638 thumbprint of the holder's signing key
    pub holder_jkt: String,
    pub issuer: String,
    pub credential_type: String,
    pub policy: Policy,
    /// Unix milliseconds; `None` never expires
    pub expires_at: Option<i64>,
}

/// One entry of a registry file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollmentRecord {
    pub credential_hash: String,
    pub pid: Pid,
    pub holder_jkt: String,
    pub issuer: String,
    pub credential_type: String,
    pub role: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl EnrollmentRecord {
    pub fn into_parts(self) -> (String, Enrollment) {
        (
            self.credential_hash,
            Enrollment {
                pid: self.pid,
                holder_jkt: self.holder_jkt,
                issuer: self.issuer,
                credential_type: self.credential_type,
                policy: Policy {
                    role: self.role,
                    scopes: self.scopes,
                },
                expires_at: self.expires_at,
            },
        )
    }
}

/// Registry file layout (`.json` or `.toml`):
///
/// ```json
/// {"enrollments": [{"credential_hash": "..", "pid": "pid:..", "holder_jkt": "..",
///   "issuer": "did:agentic:issuer:boa:main", "credential_type": "FINANCIAL_ACCOUNT",
///   "role": "bank_client", "scopes": ["bank:read"]}],
///  "revoked": [".."]}
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub enrollments: Vec<EnrollmentRecord>,
    #[serde(default)]
    pub revoked: Vec<String>,
}

/// Hash substrings the demo flows use for compromised credentials.
const REVOKED_MARKERS: [&str; 2] = ["rogue", "revoked"];

/// In-process reference registry.
///
/// Unenrolled hashes fall back to `default_policy` when one is set, which
/// reproduces an "always valid" stub. Without a default they are `unknown`.
pub struct LocalCredentialRegistry {
    enrollments: RwLock<HashMap<String, Enrollment>>,
    revoked: RwLock<HashSet<String>>,
    default_policy: Option<Policy>,
}

impl LocalCredentialRegistry {
    pub fn new(default_policy: Option<Policy>) -> Self {
        Self {
            enrollments: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashSet::new()),
            default_policy,
        }
    }

    /// Builds a registry seeded from the file at `path`.
    ///
    /// Issuer policy is still enforced per request; enrollments it would
    /// refuse are loaded and logged.
    ///
    /// # Errors
    /// `AuthError::Config` if the file is missing or malformed.
    pub fn from_file(path: &str, default_policy: Option<Policy>) -> Result<Self> {
        let contents: RegistryFile = Config::builder()
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()?;

        let registry = Self::new(default_policy);
        let (enrolled, revoked) = (contents.enrollments.len(), contents.revoked.len());
        for record in contents.enrollments {
            if let Err(e) = issuer_policy::validate(&record.issuer, &record.credential_type) {
                log::warn!(
                    "enrollment {} will be refused at check time: {}",
                    record.credential_hash,
                    e
                );
            }
            registry.enroll_record(record)?;
        }
        for credential_hash in contents.revoked {
            registry.revoke(credential_hash)?;
        }

        log::info!(
            "loaded {} enrollments and {} revocations from {}",
            enrolled,
            revoked,
            path
        );
        Ok(registry)
    }

    /// Registers `credential_hash`. Replaces any earlier enrollment.
    pub fn enroll(&self, credential_hash: impl Into<String>, enrollment: Enrollment) -> Result<()> {
        let mut enrollments = self
            .enrollments
            .write()
            .map_err(|_| AuthError::Internal("registry lock poisoned".into()))?;
        enrollments.insert(credential_hash.into(), enrollment);
        Ok(())
    }

    pub fn enroll_record(&self, record: EnrollmentRecord) -> Result<()> {
        let (credential_hash, enrollment) = record.into_parts();
        self.enroll(credential_hash, enrollment)
    }

    /// Marks `credential_hash` as revoked.
    pub fn revoke(&self, credential_hash: impl Into<String>) -> Result<()> {
        let mut revoked = self
            .revoked
            .write()
            .map_err(|_| AuthError::Internal("registry lock poisoned".into()))?;
        revoked.insert(credential_hash.into());
        Ok(())
    }

    fn is_revoked(&self, credential_hash: &str) -> Option<bool> {
        if REVOKED_MARKERS.iter().any(|m| credential_hash.contains(m)) {
            return Some(true);
        }
        self.revoked.read().ok().map(|set| set.contains(credential_hash))
    }

    fn check_enrollment(enrollment: &Enrollment) -> VerificationResult {
        if let Some(expires_at) = enrollment.expires_at {
            if Utc::now().timestamp_millis() >= expires_at {
                return VerificationResult::with_status(CredentialStatus::Expired);
            }
        }
        if let Err(e) = issuer_policy::validate(&enrollment.issuer, &enrollment.credential_type) {
            log::info!("issuer policy refused credential: {}", e);
            return VerificationResult::unknown(e.to_string());
        }
        VerificationResult::valid(enrollment.policy.clone())
            .for_holder(enrollment.pid.clone(), enrollment.holder_jkt.clone())
    }
}

#[async_trait]
impl CredentialRegistry for LocalCredentialRegistry {
    async fn verify_receipt(&self, receipt: &RegistryReceipt) -> VerificationResult {
        if receipt.cred_hash.is_empty() || receipt.attestation.is_empty() {
            return VerificationResult::unknown("empty receipt");
        }

        match self.is_revoked(&receipt.cred_hash) {
            Some(true) => return VerificationResult::with_status(CredentialStatus::Revoked),
            Some(false) => {}
            None => return VerificationResult::unknown("registry lock poisoned"),
        }

        let enrollment = match self.enrollments.read() {
            Ok(enrollments) => enrollments.get(&receipt.cred_hash).cloned(),
            Err(_) => return VerificationResult::unknown("registry lock poisoned"),
        };

        match (enrollment, &self.default_policy) {
            (Some(enrollment), _) => Self::check_enrollment(&enrollment),
            (None, Some(policy)) => VerificationResult::valid(policy.clone()),
            (None, None) => VerificationResult::unknown("credential not enrolled"),
        }
    }
}

/// Selects the registry described by `settings`.
///
/// A `registry_url` selects the remote registry. Otherwise the local registry
/// is used, seeded from `registry_file` when one is configured.
///
/// # Errors
/// `AuthError::Config` if the HTTP client or the registry file fails.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn CredentialRegistry>> {
    if let Some(url) = &settings.registry_url {
        log::info!("using remote credential registry at {}", url);
        return Ok(Arc::new(HttpCredentialRegistry::new(url, settings.registry_timeout())?));
    }

    let default_policy = settings.local_default_policy();
    if default_policy.is_some() {
        log::warn!("local registry accepts unenrolled credentials as {:?}", default_policy);
    }
    match &settings.registry_file {
        Some(path) => Ok(Arc::new(LocalCredentialRegistry::from_file(path, default_policy)?)),
        None => {
            log::warn!("no registry_url or registry_file configured; local registry starts empty");
            Ok(Arc::new(LocalCredentialRegistry::new(default_policy)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn receipt(hash: &str) -> RegistryReceipt {
        RegistryReceipt {
            cred_hash: hash.into(),
            attestation: "att".into(),
        }
    }

    fn bank_policy() -> Policy {
        Policy {
            role: "bank_client".into(),
            scopes: vec!["bank:read".into()],
        }
    }

    fn enrollment(issuer: &str, credential_type: &str, expires_at: Option<i64>) -> Enrollment {
        Enrollment {
            pid: Pid::from_seed(b"holder"),
            holder_jkt: "holder-thumb".into(),
            issuer: issuer.into(),
            credential_type: credential_type.into(),
            policy: bank_policy(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_local_default_policy_and_unknown() {
        let stub = LocalCredentialRegistry::new(Some(bank_policy()));
        let result = stub.verify_receipt(&receipt("anything")).await;
        assert_eq!(result.status, CredentialStatus::Valid);
        assert_eq!(result.policy, Some(bank_policy()));

        let strict = LocalCredentialRegistry::new(None);
        let result = strict.verify_receipt(&receipt("anything")).await;
        assert_eq!(result.status, CredentialStatus::Unknown);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_local_revocation() {
        let registry = LocalCredentialRegistry::new(Some(bank_policy()));
        registry.revoke("cred-1").unwrap();

        let revoked = registry.verify_receipt(&receipt("cred-1")).await;
        assert_eq!(revoked.status, CredentialStatus::Revoked);
        assert!(revoked.policy.is_none());

        let rogue = registry.verify_receipt(&receipt("rogue-agent-hash")).await;
        assert_eq!(rogue.status, CredentialStatus::Revoked);
    }

    #[tokio::test]
    async fn test_local_enrollment_checks() {
        let registry = LocalCredentialRegistry::new(None);
        let past = Utc::now().timestamp_millis() - 1;
        registry
            .enroll("ok", enrollment(issuer_policy::BANK_OF_AMERICA, "FINANCIAL_ACCOUNT", None))
            .unwrap();
        registry
            .enroll("old", enrollment(issuer_policy::BANK_OF_AMERICA, "FINANCIAL_ACCOUNT", Some(past)))
            .unwrap();
        registry
            .enroll("inactive", enrollment(issuer_policy::BANK_ISSUER, "FINANCIAL_ACCOUNT", None))
            .unwrap();

        let ok = registry.verify_receipt(&receipt("ok")).await;
        assert_eq!(ok.status, CredentialStatus::Valid);
        assert_eq!(ok.pid, Some(Pid::from_seed(b"holder")));
        assert_eq!(ok.holder_jkt.as_deref(), Some("holder-thumb"));
        assert_eq!(
            registry.verify_receipt(&receipt("old")).await.status,
            CredentialStatus::Expired
        );
        let inactive = registry.verify_receipt(&receipt("inactive")).await;
        assert_eq!(inactive.status, CredentialStatus::Unknown);
        assert!(inactive.error.unwrap().contains("inactive"));
    }

    #[tokio::test]
    async fn test_local_rejects_empty_receipt() {
        let registry = LocalCredentialRegistry::new(Some(bank_policy()));
        let result = registry
            .verify_receipt(&RegistryReceipt {
                cred_hash: "cred".into(),
                attestation: String::new(),
            })
            .await;
        assert_eq!(result.status, CredentialStatus::Unknown);
    }

    /// Writes `contents` to a fresh file under the temp dir.
    fn write_registry_file(extension: &str, contents: &str) -> std::path::PathBuf {
        let name = format!(
            "gatekeeper-registry-{}.{}",
            hex::encode(crate::utils::crypto::random_bytes::<8>().unwrap()),
            extension
        );
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn settings_with(overrides: &[(&str, &str)]) -> Settings {
        let mut builder = Settings::builder()
            .unwrap()
            .set_override("token_secret", "0123456789abcdef0123456789abcdef")
            .unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Settings::from_config(builder.build().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_registry_file_seeds_enrollments_and_revocations() {
        let pid = Pid::from_seed(b"holder");
        let path = write_registry_file(
            "json",
            &json!({
                "enrollments": [
                    {
                        "credential_hash": "Cred-OK_mixedCase",
                        "pid": pid,
                        "holder_jkt": "holder-thumb",
                        "issuer": issuer_policy::BANK_OF_AMERICA,
                        "credential_type": "FINANCIAL_ACCOUNT",
                        "role": "bank_client",
                        "scopes": ["bank:read", "bank:transfer"]
                    },
                    {
                        "credential_hash": "cred-forbidden",
                        "pid": pid,
                        "holder_jkt": "holder-thumb",
                        "issuer": issuer_policy::BANK_OF_AMERICA,
                        "credential_type": "KYC_LEVEL_1",
                        "role": "bank_client"
                    }
                ],
                "revoked": ["cred-gone"]
            })
            .to_string(),
        );

        let registry = LocalCredentialRegistry::from_file(path.to_str().unwrap(), None).unwrap();
        std::fs::remove_file(&path).ok();

        let ok = registry.verify_receipt(&receipt("Cred-OK_mixedCase")).await;
        assert_eq!(ok.status, CredentialStatus::Valid);
        assert_eq!(ok.pid, Some(pid));
        assert_eq!(ok.holder_jkt.as_deref(), Some("holder-thumb"));
        assert_eq!(ok.policy.unwrap().scopes, vec!["bank:read", "bank:transfer"]);

        // Issuer allow-list runs at check time
        let forbidden = registry.verify_receipt(&receipt("cred-forbidden")).await;
        assert_eq!(forbidden.status, CredentialStatus::Unknown);

        let gone = registry.verify_receipt(&receipt("cred-gone")).await;
        assert_eq!(gone.status, CredentialStatus::Revoked);

        let stranger = registry.verify_receipt(&receipt("cred-unlisted")).await;
        assert_eq!(stranger.status, CredentialStatus::Unknown);
    }

    #[test]
    fn test_missing_registry_file_is_a_config_error() {
        let result = LocalCredentialRegistry::from_file("/nonexistent/gatekeeper-registry.json", None);
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[tokio::test]
    async fn test_from_settings_uses_registry_file() {
        let path = write_registry_file(
            "toml",
            r#"
revoked = ["cred-gone"]

[[enrollments]]
credential_hash = "cred-1"
pid = "pid:holder"
holder_jkt = "holder-thumb"
issuer = "did:agentic:issuer:boa:main"
credential_type = "FINANCIAL_ACCOUNT"
role = "bank_client"
scopes = ["bank:read"]
"#,
        );
        let settings = settings_with(&[("registry_file", path.to_str().unwrap())]);
        let registry = from_settings(&settings).unwrap();
        std::fs::remove_file(&path).ok();

        let result = registry.verify_receipt(&receipt("cred-1")).await;
        assert_eq!(result.status, CredentialStatus::Valid);
        assert_eq!(result.pid, Some(Pid::from("pid:holder".to_string())));
        assert_eq!(
            registry.verify_receipt(&receipt("cred-gone")).await.status,
            CredentialStatus::Revoked
        );

        // Nothing configured: empty strict registry
        let empty = from_settings(&settings_with(&[])).unwrap();
        assert_eq!(
            empty.verify_receipt(&receipt("cred-1")).await.status,
            CredentialStatus::Unknown
        );
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_registry_valid_and_request_shape() {
        let router = Router::new().route(
            "/verify",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["credentialHash"], "cred-1");
                assert_eq!(body["attestation"], "att");
                Json(json!({
                    "status": "valid",
                    "policy": {"role": "bank_client", "scopes": ["bank:read"]},
                    "verifiedAt": 1
                }))
            }),
        );
        let base = serve(router).await;
        let registry = HttpCredentialRegistry::new(&base, Duration::from_secs(2)).unwrap();

        let result = registry.verify_receipt(&receipt("cred-1")).await;
        assert_eq!(result.status, CredentialStatus::Valid);
        assert_eq!(result.policy, Some(bank_policy()));
    }

    #[tokio::test]
    async fn test_http_registry_failures_are_unknown() {
        let router = Router::new()
            .route(
                "/verify",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let base = serve(router).await;
        let registry = HttpCredentialRegistry::new(&base, Duration::from_secs(2)).unwrap();
        let result = registry.verify_receipt(&receipt("cred-1")).await;
        assert_eq!(result.status, CredentialStatus::Unknown);

        let garbage = serve(Router::new().route("/verify", post(|| async { "not json" }))).await;
        let registry = HttpCredentialRegistry::new(&garbage, Duration::from_secs(2)).unwrap();
        let result = registry.verify_receipt(&receipt("cred-1")).await;
        assert_eq!(result.status, CredentialStatus::Unknown);
    }

    #[tokio::test]
    async fn test_http_registry_timeout_is_unknown() {
        let router = Router::new().route(
            "/verify",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"status": "valid"}))
            }),
        );
        let base = serve(router).await;
        let registry = HttpCredentialRegistry::new(&base, Duration::from_millis(100)).unwrap();

        let result = registry.verify_receipt(&receipt("cred-1")).await;
        assert_eq!(result.status, CredentialStatus::Unknown);
        assert!(result.error.is_some());
    }
}
