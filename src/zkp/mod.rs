// src/zkp/mod.rs
//! Disclosure proofs over credential attributes.

pub mod selective_disclosure;
