// src/error.rs
//! Error taxonomy for the presentation and capability-token pipeline.
//!
//! Every verification failure is terminal for the attempt that produced it.
//! The HTTP layer only ever sees the category message from
//! [`AuthError::public_message`]; internal detail stays in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type used across the gatekeeper.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures of the challenge/presentation/token pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown, already consumed, or expired nonce. The three cases are
    /// deliberately indistinguishable.
    #[error("invalid or expired challenge")]
    InvalidChallenge,

    /// The presentation signature does not verify over the canonical payload
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Disclosed fields don't match the committed selective-disclosure proof
    #[error("selective disclosure proof inconsistent: {0}")]
    ProofInconsistent(String),

    /// Registry reports the credential as revoked
    #[error("credential revoked")]
    CredentialRevoked,

    /// Registry reports the credential as expired
    #[error("credential expired")]
    CredentialExpired,

    /// Registry could not attest to the credential
    #[error("credential status unknown: {0}")]
    CredentialUnknown(String),

    /// Registry timed out or was unreachable
    #[error("credential registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Capability token is past its `exp`
    #[error("capability token expired")]
    TokenExpired,

    /// Capability token failed signature or structural checks
    #[error("capability token invalid: {0}")]
    TokenSignatureInvalid(String),

    /// Token is valid but does not carry the requested scope
    #[error("scope '{0}' not granted")]
    InsufficientScope(String),

    /// Request body or query could not be parsed
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Settings failed to load or validate
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status for this error.
    ///
    /// Challenge and request-shape problems are client errors (400),
    /// verification failures are 403, token failures are 401.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidChallenge | AuthError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::SignatureInvalid(_)
            | AuthError::ProofInconsistent(_)
            | AuthError::CredentialRevoked
            | AuthError::CredentialExpired
            | AuthError::CredentialUnknown(_)
            | AuthError::RegistryUnavailable(_)
            | AuthError::InsufficientScope(_) => StatusCode::FORBIDDEN,
            AuthError::TokenExpired | AuthError::TokenSignatureInvalid(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Config(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category message safe to return to callers.
    ///
    /// `RegistryUnavailable` is reported exactly like `CredentialUnknown`, and
    /// both token failures share one message.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidChallenge => "Invalid or expired challenge".into(),
            AuthError::SignatureInvalid(_) => "Signature verification failed".into(),
            AuthError::ProofInconsistent(_) => "Disclosure proof inconsistent".into(),
            AuthError::CredentialRevoked => "Credential revoked".into(),
            AuthError::CredentialExpired => "Credential expired".into(),
            AuthError::CredentialUnknown(_) | AuthError::RegistryUnavailable(_) => {
                "Credential status unknown".into()
            }
            AuthError::TokenExpired | AuthError::TokenSignatureInvalid(_) => {
                "Invalid or expired token".into()
            }
            AuthError::InsufficientScope(_) => "Insufficient scope".into(),
            AuthError::MalformedRequest(msg) => msg.clone(),
            AuthError::Config(_) | AuthError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        } else {
            log::debug!("request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Internal(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Config(err.to_string())
    }
}
