//! Domain Layer
//!
//! Core types, ports and services of the gateway. Nothing here knows about
//! HTTP, Kubernetes or a specific database driver.

pub mod collector_set;
pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use collector_set::{CollectorSet, CollectorSetBuilder};
pub use entities::{ElasticsearchRecord, PostgresRecord, ResourceDescriptor, SecretData};
pub use error::{ClusterError, GatewayError};
pub use value_objects::BackendKind;
