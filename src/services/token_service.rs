// src/services/token_service.rs
//! Capability Token Service.
//!
//! Mints short-lived HS256 JWTs that stand in for a session, and verifies
//! them statelessly. There is no token store and no revocation list; the TTL
//! is the only bound on a token's life.

use crate::error::{AuthError, Result};
use crate::models::credential::Pid;
use crate::models::token::{CapabilityClaims, Confirmation};
use crate::utils::crypto::random_bytes;
use crate::utils::settings::Settings;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

/// Input to [`TokenService::issue`].
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub pid: Pid,
    pub audience: String,
    pub scopes: Vec<String>,
    /// RFC 7638 thumbprint to bind the token to, if any
    pub pop_thumbprint: Option<String>,
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: CapabilityClaims,
}

/// Issues and verifies capability tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    issuer: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Creates a token service.
    ///
    /// # Arguments
    /// * `issuer` - Value of `iss`; also required on verification
    /// * `secret` - HMAC key
    /// * `ttl` - Lifetime of each issued token
    pub fn new(issuer: impl Into<String>, secret: &[u8], ttl: Duration) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so it can be reported on its own
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);

        Self {
            issuer,
            ttl,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.token_issuer.clone(),
            settings.token_secret.as_bytes(),
            settings.token_ttl(),
        )
    }

    /// Mints a token for a verified presentation.
    ///
    /// Sets `iat` to now, `exp` to now + TTL and draws a fresh 128-bit `jti`.
    ///
    /// # Errors
    /// `AuthError::Internal` if randomness or signing fails.
    pub fn issue(&self, request: TokenRequest) -> Result<IssuedToken> {
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| AuthError::Internal("token ttl out of range".into()))?;
        let now = Utc::now().timestamp();

        let claims = CapabilityClaims {
            iss: self.issuer.clone(),
            sub: request.pid.to_string(),
            aud: request.audience,
            scope: request.scopes,
            iat: now,
            exp: now + ttl,
            jti: hex::encode(random_bytes::<16>()?),
            cnf: request.pop_thumbprint.map(|jkt| Confirmation { jkt }),
        };

        let token = self.sign_claims(&claims)?;
        log::info!(
            "issued capability token jti={} sub={} scopes={:?}",
            claims.jti,
            claims.sub,
            claims.scope
        );
        Ok(IssuedToken { token, claims })
    }

    pub(crate) fn sign_claims(&self, claims: &CapabilityClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {}", e)))
    }

    /// Verifies a token and returns its claims.
    ///
    /// Signature and issuer are checked first, then `exp > now` with no
    /// leeway.
    ///
    /// # Errors
    /// - `AuthError::TokenSignatureInvalid` for a bad signature, algorithm,
    ///   issuer or structure
    /// - `AuthError::TokenExpired` once `exp` has passed
    pub fn verify(&self, token: &str) -> Result<CapabilityClaims> {
        let data = decode::<CapabilityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::TokenSignatureInvalid(e.to_string()))?;

        let claims = data.claims;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}
