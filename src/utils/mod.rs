// src/utils/mod.rs
//! Shared helpers: hashing and encoding, signing, serialization, settings.

pub mod crypto;
pub mod serialization;
pub mod settings;
pub mod signature;
