//! metrics-gateway Library
//!
//! This module exposes the gateway components for use in integration tests
//! and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{EvictionHandler, ExpositionServer, ProvisionerRegistry, RequestDispatcher};
pub use config::load_config;
pub use domain::entities::ResourceDescriptor;
pub use domain::error::{ClusterError, GatewayError};
pub use domain::ports::{BackendProvisioner, ClusterResourceClient, Collector, SecretStore};
pub use domain::services::{CollectorCache, Credentials};
pub use domain::value_objects::BackendKind;
pub use domain::CollectorSet;
