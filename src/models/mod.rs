// src/models/mod.rs
//! Wire and domain data structures.

pub mod challenge;
pub mod credential;
pub mod presentation;
pub mod token;
