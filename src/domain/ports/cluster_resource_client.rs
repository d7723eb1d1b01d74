//! Cluster Resource Client Port
//!
//! Defines the interface for resolving monitored resources by namespace/name.

use crate::domain::entities::{ElasticsearchRecord, PostgresRecord};
use crate::domain::error::ClusterError;
use async_trait::async_trait;

/// Client for the cluster orchestration API.
///
/// This is an outbound port with one lookup per backend resource type.
/// Implementations report a missing object as `ClusterError::NotFound`
/// so provisioners can surface it as a 404.
#[async_trait]
pub trait ClusterResourceClient: Send + Sync {
    /// Look up a Postgres resource.
    async fn get_postgres(&self, namespace: &str, name: &str)
        -> Result<PostgresRecord, ClusterError>;

    /// Look up an Elasticsearch resource.
    async fn get_elasticsearch(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ElasticsearchRecord, ClusterError>;
}
