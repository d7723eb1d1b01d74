//! Application Layer
//!
//! Use cases wiring the domain services to the inbound adapters.

mod dispatcher;
mod eviction;
mod exposition;

pub use dispatcher::{ExportRequest, ProvisionerRegistry, RequestDispatcher};
pub use eviction::EvictionHandler;
pub use exposition::{ExpositionServer, CONTENT_TYPE};
