//! HTTP request model and transport collaborator

pub mod request;
pub mod transport;

pub use request::{Body, RequestDescriptor, WireRequest, WireResponse};
pub use transport::{HttpTransport, Transport};
