// src/services/challenge_authority.rs
//! Challenge Authority.
//!
//! Issues single-use nonces bound to an audience and an expiry, and hands each
//! one out for consumption at most once. Consumption is a single atomic
//! remove on the backing store, so concurrent presentations racing on one
//! nonce see exactly one winner. Unknown, consumed and expired nonces all
//! fail the same way.

use crate::error::{AuthError, Result};
use crate::models::challenge::Challenge;
use crate::utils::crypto::{b64url_encode, random_bytes};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Nonce entropy in bytes.
pub const NONCE_BYTES: usize = 32;

/// Backing storage for outstanding challenges.
///
/// `take` must be an atomic compare-and-delete: of any number of concurrent
/// callers for one nonce, at most one receives `Some`. A multi-instance
/// deployment implements this over a shared key-value store.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn put(&self, challenge: Challenge) -> Result<()>;

    /// Removes and returns the entry for `nonce`, if present.
    async fn take(&self, nonce: &str) -> Result<Option<Challenge>>;

    /// Drops every entry expired at `now_ms`. Returns how many were dropped.
    async fn purge_expired(&self, now_ms: i64) -> Result<usize>;

    /// Number of outstanding entries.
    async fn len(&self) -> Result<usize>;
}

/// Single-process store over a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryChallengeStore {
    entries: Mutex<HashMap<String, Challenge>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Challenge>>> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Internal("challenge store lock poisoned".into()))
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn put(&self, challenge: Challenge) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.contains_key(&challenge.nonce) {
            return Err(AuthError::Internal("nonce collision".into()));
        }
        entries.insert(challenge.nonce.clone(), challenge);
        Ok(())
    }

    async fn take(&self, nonce: &str) -> Result<Option<Challenge>> {
        Ok(self.lock()?.remove(nonce))
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, challenge| !challenge.is_expired_at(now_ms));
        Ok(before - entries.len())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

/// First characters of a nonce, safe to log.
fn short(nonce: &str) -> &str {
    nonce.get(..8).unwrap_or(nonce)
}

/// Issues and consumes challenges.
pub struct ChallengeAuthority {
    store: Arc<dyn ChallengeStore>,
    default_audience: String,
    ttl: Duration,
}

impl ChallengeAuthority {
    /// # Arguments
    /// * `store` - Backing store for outstanding challenges
    /// * `default_audience` - Audience used when a request names none
    /// * `ttl` - Lifetime of each issued challenge
    pub fn new(store: Arc<dyn ChallengeStore>, default_audience: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            default_audience: default_audience.into(),
            ttl,
        }
    }

    /// Issues a challenge for `audience` (or the default) with the configured TTL.
    pub async fn issue(&self, audience: Option<&str>) -> Result<Challenge> {
        self.issue_with_ttl(audience, self.ttl).await
    }

    /// Issues a challenge with an explicit lifetime.
    ///
    /// # Errors
    /// - `AuthError::MalformedRequest` for a blank audience
    /// - `AuthError::Internal` if randomness or storage fails
    pub async fn issue_with_ttl(&self, audience: Option<&str>, ttl: Duration) -> Result<Challenge> {
        let audience = match audience {
            Some(aud) if aud.trim().is_empty() => {
                return Err(AuthError::MalformedRequest("audience must not be empty".into()))
            }
            Some(aud) => aud.to_string(),
            None => self.default_audience.clone(),
        };

        let ttl_ms = i64::try_from(ttl.as_millis())
            .map_err(|_| AuthError::Internal("challenge ttl out of range".into()))?;
        let challenge = Challenge {
            nonce: b64url_encode(&random_bytes::<NONCE_BYTES>()?),
            audience,
            expires_at: Utc::now().timestamp_millis() + ttl_ms,
        };

        self.store.put(challenge.clone()).await?;
        log::debug!(
            "issued challenge {}.. for {} (exp {})",
            short(&challenge.nonce),
            challenge.audience,
            challenge.expires_at
        );
        Ok(challenge)
    }

    /// Consumes `nonce` exactly once.
    ///
    /// The entry is removed before its expiry is checked, so an expired
    /// challenge is also gone after this call.
    ///
    /// # Errors
    /// `AuthError::InvalidChallenge` when the nonce is unknown, already
    /// consumed, or expired.
    pub async fn consume(&self, nonce: &str) -> Result<Challenge> {
        let challenge = self
            .store
            .take(nonce)
            .await?
            .ok_or(AuthError::InvalidChallenge)?;

        if challenge.is_expired() {
            log::debug!("challenge {}.. consumed after expiry", short(nonce));
            return Err(AuthError::InvalidChallenge);
        }
        Ok(challenge)
    }

    /// Drops expired challenges now.
    pub async fn sweep(&self) -> Result<usize> {
        self.store.purge_expired(Utc::now().timestamp_millis()).await
    }

    /// Outstanding challenge count.
    pub async fn pending(&self) -> Result<usize> {
        self.store.len().await
    }

    /// Runs [`sweep`](Self::sweep) every `period` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(0) => {}
                    Ok(n) => log::debug!("swept {} expired challenges", n),
                    Err(e) => log::error!("challenge sweep failed: {}", e),
                }
            }
        })
    }
}
