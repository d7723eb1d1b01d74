//! DashMap Cluster
//!
//! In-memory implementation of `ClusterResourceClient` and `SecretStore`.
//! Test double for the provisioners and the router; counts lookups so tests
//! can assert how often the cluster was consulted.

use crate::domain::entities::{ElasticsearchRecord, ObjectMeta, PostgresRecord, SecretData};
use crate::domain::error::ClusterError;
use crate::domain::ports::{ClusterResourceClient, SecretStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

type ObjectKey = (String, String);

fn object_key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// DashMap-backed cluster state.
///
/// Objects are keyed by `(namespace, name)`. Every lookup is counted so
/// callers can assert how often the cluster was consulted.
#[derive(Default)]
pub struct DashMapCluster {
    postgres: DashMap<ObjectKey, PostgresRecord>,
    elasticsearch: DashMap<ObjectKey, ElasticsearchRecord>,
    secrets: DashMap<ObjectKey, SecretData>,
    lookups: AtomicUsize,
}

impl DashMapCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_postgres(&self, namespace: &str, mut record: PostgresRecord) {
        let name = record.metadata.name.clone();
        record.metadata.namespace = namespace.to_string();
        self.postgres.insert(object_key(namespace, &name), record);
    }

    pub fn insert_elasticsearch(&self, namespace: &str, name: &str) {
        let record = ElasticsearchRecord {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
        };
        self.elasticsearch.insert(object_key(namespace, name), record);
    }

    pub fn insert_secret(&self, namespace: &str, name: &str, data: SecretData) {
        self.secrets.insert(object_key(namespace, name), data);
    }

    pub fn remove_postgres(&self, namespace: &str, name: &str) -> bool {
        self.postgres.remove(&object_key(namespace, name)).is_some()
    }

    /// Total number of resource and secret lookups served.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn record_lookup(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterResourceClient for DashMapCluster {
    async fn get_postgres(&self, namespace: &str, name: &str) -> Result<PostgresRecord, ClusterError> {
        self.record_lookup();
        self.postgres
            .get(&object_key(namespace, name))
            .map(|e| e.value().clone())
            .ok_or(ClusterError::NotFound)
    }

    async fn get_elasticsearch(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ElasticsearchRecord, ClusterError> {
        self.record_lookup();
        self.elasticsearch
            .get(&object_key(namespace, name))
            .map(|e| e.value().clone())
            .ok_or(ClusterError::NotFound)
    }
}

#[async_trait]
impl SecretStore for DashMapCluster {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<SecretData, ClusterError> {
        self.record_lookup();
        self.secrets
            .get(&object_key(namespace, name))
            .map(|e| e.value().clone())
            .ok_or(ClusterError::NotFound)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::entities::{PostgresSpec, SecretReference};

    fn pg(name: &str) -> PostgresRecord {
        PostgresRecord {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: String::new(),
            },
            spec: PostgresSpec {
                database_secret: Some(SecretReference {
                    secret_name: format!("{}-auth", name),
                }),
            },
        }
    }

    #[tokio::test]
    async fn test_postgres_lookup_is_namespaced() {
        let cluster = DashMapCluster::new();
        cluster.insert_postgres("ns1", pg("pg1"));

        let record = cluster.get_postgres("ns1", "pg1").await.unwrap();
        assert_eq!(record.metadata.namespace, "ns1");
        assert_eq!(
            cluster.get_postgres("ns2", "pg1").await,
            Err(ClusterError::NotFound)
        );
        assert_eq!(cluster.lookups(), 2);
    }

    #[tokio::test]
    async fn test_remove_postgres() {
        let cluster = DashMapCluster::new();
        cluster.insert_postgres("ns1", pg("pg1"));
        assert!(cluster.remove_postgres("ns1", "pg1"));
        assert!(!cluster.remove_postgres("ns1", "pg1"));
        assert!(cluster.get_postgres("ns1", "pg1").await.is_err());
    }

    #[tokio::test]
    async fn test_elasticsearch_and_secret_lookup() {
        let cluster = DashMapCluster::new();
        cluster.insert_elasticsearch("ns1", "es1");
        cluster.insert_secret(
            "ns1",
            "s",
            SecretData::from([(".admin".to_string(), b"K=V".to_vec())]),
        );

        assert!(cluster.get_elasticsearch("ns1", "es1").await.is_ok());
        let secret = cluster.get_secret("ns1", "s").await.unwrap();
        assert_eq!(secret[".admin"], b"K=V".to_vec());
        assert_eq!(cluster.get_secret("ns1", "other").await, Err(ClusterError::NotFound));
    }
}
