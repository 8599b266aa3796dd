// src/wallet/gatekeeper_client.rs
//! Holder-side client for a running gatekeeper.
//!
//! Fetches a challenge, answers it with a presentation and returns the
//! capability token the gatekeeper grants.

use crate::error::{AuthError, Result};
use crate::models::challenge::Challenge;
use crate::models::credential::DisclosedFields;
use crate::models::presentation::Presentation;
use crate::wallet::agent_credential::AgentCredential;
use crate::wallet::presentation_builder::build_presentation;
use crate::zkp::selective_disclosure::SelectiveDisclosure;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Token granted by `POST /present`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GrantedToken {
    pub token: String,
    pub pid: String,
    pub role: String,
    pub scopes: Vec<String>,
    pub expires_in: i64,
}

#[derive(Serialize)]
struct ChallengeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
}

#[derive(Serialize)]
struct PresentBody<'a> {
    vp: &'a Presentation,
    challenge_nonce: &'a str,
}

pub struct GatekeeperClient {
    client: reqwest::Client,
    base_url: String,
}

impl GatekeeperClient {
    /// # Errors
    /// `AuthError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Config(format!("gatekeeper client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn challenge(&self, audience: Option<&str>) -> Result<Challenge> {
        self.post("/challenge", &ChallengeBody { audience }).await
    }

    pub async fn present(&self, vp: &Presentation, challenge_nonce: &str) -> Result<GrantedToken> {
        self.post("/present", &PresentBody { vp, challenge_nonce }).await
    }

    /// Runs the whole exchange for `credential`.
    ///
    /// # Errors
    /// `AuthError::Internal` carrying the gatekeeper's `{error}` message when
    /// any step is refused or the gatekeeper cannot be reached.
    pub async fn authenticate(
        &self,
        credential: &AgentCredential,
        disclosed: DisclosedFields,
        audience: Option<&str>,
        scheme: &dyn SelectiveDisclosure,
    ) -> Result<GrantedToken> {
        let challenge = self.challenge(audience).await?;
        log::debug!("answering challenge for audience {}", challenge.audience);
        let vp = build_presentation(credential, &challenge, disclosed, scheme)?;
        self.present(&vp, &challenge.nonce).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Internal(format!("{} unreachable: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_owned))
                .unwrap_or_else(|| status.to_string());
            return Err(AuthError::Internal(format!("{} refused: {}", path, message)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::Internal(format!("{} answered garbage: {}", path, e)))
    }
}
