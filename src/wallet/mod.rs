// src/wallet/mod.rs
//! Holder wallet: keys, credentials and presentation assembly.

pub mod agent_credential;
pub mod gatekeeper_client;
pub mod key_management;
pub mod presentation_builder;
