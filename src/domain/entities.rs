//! Domain Entities
//!
//! The request-side descriptor of a monitored resource and the cluster
//! records the provisioners resolve it against.

use crate::domain::value_objects::{BackendKind, DEFAULT_INSTANCE_ADDRESS};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A monitored resource as identified by an inbound request.
///
/// Built once per request after validation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Namespace the resource lives in
    pub namespace: String,
    /// Backend kind selecting the provisioner
    pub kind: BackendKind,
    /// Resource name within the namespace
    pub name: String,
    /// Network address of the instance to scrape
    pub instance_address: String,
}

impl ResourceDescriptor {
    /// Create a descriptor. An empty or missing address falls back to loopback.
    pub fn new(
        namespace: impl Into<String>,
        kind: BackendKind,
        name: impl Into<String>,
        instance_address: Option<&str>,
    ) -> Self {
        let instance_address = match instance_address {
            Some(addr) if !addr.is_empty() => addr.to_string(),
            _ => DEFAULT_INSTANCE_ADDRESS.to_string(),
        };
        Self {
            namespace: namespace.into(),
            kind,
            name: name.into(),
            instance_address,
        }
    }
}

/// Object metadata common to all cluster records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// Reference to the secret holding a database's admin credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresSpec {
    #[serde(default)]
    pub database_secret: Option<SecretReference>,
}

/// A Postgres resource as stored in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostgresRecord {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PostgresSpec,
}

/// An Elasticsearch resource as stored in the cluster.
///
/// Only its existence matters for provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ElasticsearchRecord {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

/// Decoded secret payload, one byte blob per sub-key.
pub type SecretData = BTreeMap<String, Vec<u8>>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults_to_loopback() {
        let d = ResourceDescriptor::new("ns1", BackendKind::Postgres, "pg1", None);
        assert_eq!(d.instance_address, "127.0.0.1");

        let d = ResourceDescriptor::new("ns1", BackendKind::Postgres, "pg1", Some(""));
        assert_eq!(d.instance_address, "127.0.0.1");
    }

    #[test]
    fn test_descriptor_keeps_explicit_address() {
        let d = ResourceDescriptor::new("ns1", BackendKind::Elasticsearch, "es1", Some("10.0.0.5"));
        assert_eq!(d.instance_address, "10.0.0.5");
        assert_eq!(d.namespace, "ns1");
        assert_eq!(d.name, "es1");
    }

    #[test]
    fn test_postgres_record_deserialize() {
        let json = serde_json::json!({
            "apiVersion": "kubedb.com/v1alpha1",
            "kind": "Postgres",
            "metadata": {"name": "pg1", "namespace": "ns1", "uid": "abc"},
            "spec": {"databaseSecret": {"secretName": "pg1-admin-auth"}, "version": "9.5"}
        });
        let record: PostgresRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.metadata.name, "pg1");
        assert_eq!(
            record.spec.database_secret.unwrap().secret_name,
            "pg1-admin-auth"
        );
    }

    #[test]
    fn test_postgres_record_without_secret() {
        let json = serde_json::json!({"metadata": {"name": "pg1"}, "spec": {}});
        let record: PostgresRecord = serde_json::from_value(json).unwrap();
        assert!(record.spec.database_secret.is_none());
    }
}
