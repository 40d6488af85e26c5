//! Domain data types for the Clasp SDK
//!
//! All wire-facing structures follow the server's `snake_case` naming
//! convention, which matches Rust field naming directly.

pub mod client;
pub mod events;
pub mod token;

pub use client::*;
pub use events::*;
pub use token::*;
