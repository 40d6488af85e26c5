//! Session token cache and fetcher

pub mod cache;
mod jwt;

pub use cache::{GetTokenOptions, TokenCache};
