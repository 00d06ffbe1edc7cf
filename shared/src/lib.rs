//! Shared types and models for the Retail POS backend
//!
//! This crate contains the pure domain logic (sale arithmetic, input
//! normalization, validation) shared between the backend server and the
//! browser checkout screen (via WASM).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
