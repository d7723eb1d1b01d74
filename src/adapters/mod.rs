//! Adapters Layer
//!
//! Inbound adapters drive the application (HTTP); outbound adapters
//! implement the domain ports (Kubernetes API, backend collectors).

pub mod inbound;
pub mod outbound;
