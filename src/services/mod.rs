// src/services/mod.rs
//! Challenge, verification and token services, plus the HTTP surface.

pub mod api_server;
pub mod challenge_authority;
pub mod token_service;
pub mod verifier;
