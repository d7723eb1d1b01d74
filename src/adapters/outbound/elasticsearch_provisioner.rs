//! Elasticsearch Provisioner
//!
//! Resolves an Elasticsearch resource and builds a collector set with a
//! cluster health collector and a local-node stats collector.

use crate::adapters::outbound::collectors::{ClusterHealthCollector, NodesCollector};
use crate::domain::collector_set::CollectorSet;
use crate::domain::entities::ResourceDescriptor;
use crate::domain::error::GatewayError;
use crate::domain::ports::{BackendProvisioner, ClusterResourceClient};
use crate::domain::value_objects::BackendKind;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const ELASTICSEARCH_PORT: u16 = 9200;
/// Client-side timeout for every request to the cluster.
pub const ELASTICSEARCH_TIMEOUT: Duration = Duration::from_secs(5);

pub fn endpoint(instance_address: &str) -> String {
    format!("http://{}:{}", instance_address, ELASTICSEARCH_PORT)
}

pub struct ElasticsearchProvisioner {
    resources: Arc<dyn ClusterResourceClient>,
    timeout: Duration,
    all_nodes: bool,
}

impl ElasticsearchProvisioner {
    pub fn new(resources: Arc<dyn ClusterResourceClient>) -> Self {
        Self {
            resources,
            timeout: ELASTICSEARCH_TIMEOUT,
            all_nodes: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the collectors for one instance. Node stats cover the local node only.
    fn collectors(
        &self,
        instance_address: &str,
    ) -> Result<(ClusterHealthCollector, NodesCollector), GatewayError> {
        let endpoint = endpoint(instance_address);
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(GatewayError::upstream)?;

        let cluster_health = ClusterHealthCollector::new(client.clone(), &endpoint)?;
        let nodes = NodesCollector::new(client, &endpoint, self.all_nodes)?;
        Ok((cluster_health, nodes))
    }
}

#[async_trait]
impl BackendProvisioner for ElasticsearchProvisioner {
    fn kind(&self) -> BackendKind {
        BackendKind::Elasticsearch
    }

    async fn provision(&self, descriptor: &ResourceDescriptor) -> Result<CollectorSet, GatewayError> {
        tracing::info!(
            "configuring exporter for Elasticsearch {} in namespace {}",
            descriptor.name,
            descriptor.namespace
        );

        self.resources
            .get_elasticsearch(&descriptor.namespace, &descriptor.name)
            .await?;

        let (cluster_health, nodes) = self.collectors(&descriptor.instance_address)?;

        CollectorSet::builder()
            .register(Arc::new(cluster_health))?
            .register(Arc::new(nodes))?
            .build()
    }
}
