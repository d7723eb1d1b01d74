//! Backend Provisioner Port
//!
//! One implementation per backend kind. The dispatcher looks provisioners
//! up by kind and runs them under the collector cache's single-flight
//! discipline, so `provision` may block on network calls freely.

use crate::domain::collector_set::CollectorSet;
use crate::domain::entities::ResourceDescriptor;
use crate::domain::error::GatewayError;
use crate::domain::value_objects::BackendKind;
use async_trait::async_trait;

#[async_trait]
pub trait BackendProvisioner: Send + Sync {
    /// Backend kind this provisioner serves.
    fn kind(&self) -> BackendKind;

    /// Resolve the resource, fetch credentials and build a ready collector set.
    ///
    /// Returns `GatewayError::ResourceNotFound` when the cluster API reports
    /// the resource as absent and `GatewayError::Upstream` for anything else.
    async fn provision(&self, descriptor: &ResourceDescriptor)
        -> Result<CollectorSet, GatewayError>;
}
