// src/services/api_server.rs
//! API Server for the presentation gatekeeper
//!
//! This module provides the REST interface through which a holder trades a
//! signed presentation for a capability token, and through which resource
//! servers check those tokens.
//!
//! The API is built using Axum and includes endpoints for:
//! - Challenge issuance (`POST /challenge`)
//! - Presentation verification and token issuance (`POST /present`)
//! - Stateless token verification (`GET /verify`)
//! - Liveness (`GET /health`)

use crate::error::{AuthError, Result};
use crate::models::challenge::Challenge;
use crate::models::presentation::Presentation;
use crate::models::token::CapabilityClaims;
use crate::services::challenge_authority::ChallengeAuthority;
use crate::services::token_service::{TokenRequest, TokenService};
use crate::services::verifier::PresentationVerifier;
use crate::utils::serialization::deserialize;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Json, Query, State},
    http::Method,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// API request and response structures

/// Request payload for `POST /challenge`
#[derive(Serialize, Deserialize, Default)]
struct ChallengeRequest {
    #[serde(default)]
    audience: Option<String>,
}

/// Request payload for `POST /present`
#[derive(Serialize, Deserialize)]
struct PresentRequest {
    vp: Presentation,
    challenge_nonce: String,
}

/// Response for a successful presentation
#[derive(Serialize, Deserialize, Debug)]
struct PresentResponse {
    token: String,
    pid: String,
    role: String,
    scopes: Vec<String>,
    /// Seconds until the token expires
    expires_in: i64,
}

/// Query string for `GET /verify`
#[derive(Serialize, Deserialize)]
struct VerifyQuery {
    token: Option<String>,
    /// Scope the caller needs
    scope: Option<String>,
    /// Thumbprint of the key the caller proved possession of
    jkt: Option<String>,
}

/// Response for a valid token
#[derive(Serialize, Deserialize, Debug)]
struct VerifyResponse {
    valid: bool,
    claims: CapabilityClaims,
}

/// Response for `GET /health`
#[derive(Serialize, Deserialize, Debug)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: String,
    pending_challenges: usize,
}

const INVALID_PRESENT_BODY: &str = "Missing or invalid vp or challenge_nonce";

/// Main API server structure holding the pipeline services
pub struct ApiServer {
    /// Issues and consumes challenges
    challenges: Arc<ChallengeAuthority>,

    /// Runs presentations through the verification pipeline
    verifier: Arc<PresentationVerifier>,

    /// Mints and checks capability tokens
    token_service: Arc<TokenService>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `challenges` - Challenge authority shared with `verifier`
    /// * `verifier` - Presentation verifier
    /// * `token_service` - Capability token service
    pub fn new(
        challenges: Arc<ChallengeAuthority>,
        verifier: PresentationVerifier,
        token_service: TokenService,
    ) -> Self {
        ApiServer {
            challenges,
            verifier: Arc::new(verifier),
            token_service: Arc::new(token_service),
        }
    }

    /// Builds the router with every route and the CORS layer.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);

        Router::new()
            .route("/challenge", post(Self::challenge_handler))
            .route("/present", post(Self::present_handler))
            .route("/verify", get(Self::verify_handler))
            .route("/health", get(Self::health_handler))
            .layer(cors)
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:8787")
    ///
    /// # Errors
    /// `AuthError::Internal` if the address cannot be bound or the server fails.
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::Internal(format!("bind {}: {}", addr, e)))?;
        log::info!("API server listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| AuthError::Internal(format!("server error: {}", e)))
    }

    // =====================
    // Challenge Handlers
    // =====================

    /// Issues a challenge
    ///
    /// # Endpoint
    /// POST /challenge
    ///
    /// # Request Body
    /// Optional JSON `{"audience": "..."}`. An empty body uses the default audience.
    ///
    /// # Responses
    /// - 200 OK: `{nonce, aud, exp}`
    /// - 400 Bad Request: body is not valid JSON
    async fn challenge_handler(
        State(state): State<Arc<ApiServer>>,
        body: Bytes,
    ) -> Result<Json<Challenge>> {
        let request = if body.iter().all(u8::is_ascii_whitespace) {
            ChallengeRequest::default()
        } else {
            deserialize::<ChallengeRequest>(&body)
                .map_err(|_| AuthError::MalformedRequest("Malformed request body".into()))?
        };

        let challenge = state.challenges.issue(request.audience.as_deref()).await?;
        Ok(Json(challenge))
    }

    // =====================
    // Presentation Handlers
    // =====================

    /// Verifies a presentation and issues a capability token
    ///
    /// # Endpoint
    /// POST /present
    ///
    /// # Request Body
    /// `{"vp": Presentation, "challenge_nonce": "..."}`
    ///
    /// # Responses
    /// - 200 OK: `{token, pid, role, scopes, expires_in}`
    /// - 400 Bad Request: malformed body, or unknown/used/expired challenge
    /// - 403 Forbidden: signature, disclosure proof or registry rejection
    async fn present_handler(
        State(state): State<Arc<ApiServer>>,
        payload: std::result::Result<Json<PresentRequest>, JsonRejection>,
    ) -> Result<Json<PresentResponse>> {
        let Json(request) = payload.map_err(|rejection| {
            log::debug!("rejected /present body: {}", rejection);
            AuthError::MalformedRequest(INVALID_PRESENT_BODY.into())
        })?;
        if request.challenge_nonce.is_empty() {
            return Err(AuthError::MalformedRequest(INVALID_PRESENT_BODY.into()));
        }

        let accepted = state
            .verifier
            .verify(&request.vp, &request.challenge_nonce)
            .await?;

        let issued = state.token_service.issue(TokenRequest {
            pid: accepted.pid.clone(),
            audience: accepted.audience,
            scopes: accepted.scopes.clone(),
            pop_thumbprint: accepted.pop_thumbprint,
        })?;

        Ok(Json(PresentResponse {
            token: issued.token,
            pid: accepted.pid.to_string(),
            role: accepted.role,
            scopes: accepted.scopes,
            expires_in: issued.claims.expires_in(issued.claims.iat),
        }))
    }

    // =====================
    // Token Handlers
    // =====================

    /// Verifies a capability token
    ///
    /// # Endpoint
    /// GET /verify?token=...[&scope=...][&jkt=...]
    ///
    /// # Responses
    /// - 200 OK: `{valid: true, claims}`
    /// - 400 Bad Request: token missing
    /// - 401 Unauthorized: invalid or expired token, or not bound to `jkt`
    /// - 403 Forbidden: `scope` not granted
    async fn verify_handler(
        State(state): State<Arc<ApiServer>>,
        query: std::result::Result<Query<VerifyQuery>, QueryRejection>,
    ) -> Result<Json<VerifyResponse>> {
        let Query(query) =
            query.map_err(|_| AuthError::MalformedRequest("Malformed query".into()))?;
        let token = query
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedRequest("Missing token".into()))?;

        let claims = state.token_service.verify(&token)?;

        if let Some(jkt) = query.jkt.as_deref() {
            if !claims.is_bound_to(jkt) {
                return Err(AuthError::TokenSignatureInvalid(
                    "token not bound to presented key".into(),
                ));
            }
        }
        if let Some(scope) = query.scope {
            if !claims.has_scope(&scope) {
                return Err(AuthError::InsufficientScope(scope));
            }
        }

        Ok(Json(VerifyResponse {
            valid: true,
            claims,
        }))
    }

    /// Health check
    ///
    /// # Endpoint
    /// GET /health
    async fn health_handler(State(state): State<Arc<ApiServer>>) -> Result<Json<HealthResponse>> {
        Ok(Json(HealthResponse {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            pending_challenges: state.challenges.pending().await?,
        }))
    }
}

// Implement Clone for ApiServer to use with Axum's State
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            challenges: Arc::clone(&self.challenges),
            verifier: Arc::clone(&self.verifier),
            token_service: Arc::clone(&self.token_service),
        }
    }
}
