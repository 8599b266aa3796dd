// src/contracts/mod.rs
//! External registry contract and issuer allow-lists.

pub mod credential_registry;
pub mod issuer_policy;
