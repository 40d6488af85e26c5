//! # Clasp Domain
//!
//! Wire types and error taxonomy for the Clasp authentication SDK.
//!
//! This crate contains:
//! - The SDK error taxonomy and structured API error envelope
//! - Client snapshot types piggy-backed on API responses
//! - Session token types with expiry tracking
//! - Domain events published by the request pipeline
//!
//! ## Architecture
//! - No dependencies on other Clasp crates
//! - Only external dependencies allowed
//! - Pure wire models and data structures

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
