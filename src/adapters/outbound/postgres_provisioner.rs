//! Postgres Provisioner
//!
//! Resolves a Postgres resource, reads its admin credentials from the
//! referenced secret and builds a collector set around a Postgres collector.

use crate::adapters::outbound::collectors::PostgresCollector;
use crate::domain::collector_set::CollectorSet;
use crate::domain::entities::ResourceDescriptor;
use crate::domain::error::GatewayError;
use crate::domain::ports::{BackendProvisioner, ClusterResourceClient, SecretStore};
use crate::domain::services::Credentials;
use crate::domain::value_objects::BackendKind;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Secret sub-key holding the admin credentials document.
pub const ADMIN_SECRET_KEY: &str = ".admin";
/// Credential keys in lookup order.
pub const USER_KEYS: [&str; 2] = ["POSTGRES_USER", "user"];
pub const PASSWORD_KEYS: [&str; 2] = ["POSTGRES_PASSWORD", "password"];
pub const DEFAULT_USER: &str = "postgres";
pub const POSTGRES_PORT: u16 = 5432;

/// Build the data source for an instance from its credentials.
///
/// A missing user falls back to `postgres`, a missing password to empty.
pub fn data_source(credentials: &Credentials, instance_address: &str) -> String {
    let lookup = |keys: &[&str]| keys.iter().find_map(|key| credentials.get(key));
    let user = lookup(&USER_KEYS).unwrap_or(DEFAULT_USER);
    let password = lookup(&PASSWORD_KEYS).unwrap_or("");
    format!(
        "postgres://{}:{}@{}:{}",
        user, password, instance_address, POSTGRES_PORT
    )
}

pub struct PostgresProvisioner {
    resources: Arc<dyn ClusterResourceClient>,
    secrets: Arc<dyn SecretStore>,
    scrape_timeout: Duration,
}

impl PostgresProvisioner {
    pub fn new(
        resources: Arc<dyn ClusterResourceClient>,
        secrets: Arc<dyn SecretStore>,
        scrape_timeout: Duration,
    ) -> Self {
        Self {
            resources,
            secrets,
            scrape_timeout,
        }
    }
}

#[async_trait]
impl BackendProvisioner for PostgresProvisioner {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn provision(&self, descriptor: &ResourceDescriptor) -> Result<CollectorSet, GatewayError> {
        let ResourceDescriptor {
            namespace, name, ..
        } = descriptor;
        tracing::info!(
            "configuring exporter for PostgreSQL {} in namespace {}",
            name,
            namespace
        );

        let record = self.resources.get_postgres(namespace, name).await?;
        let secret_name = record
            .spec
            .database_secret
            .map(|s| s.secret_name)
            .ok_or_else(|| {
                GatewayError::Upstream(format!("postgres {}/{} has no database secret", namespace, name))
            })?;

        let secret = self
            .secrets
            .get_secret(namespace, &secret_name)
            .await
            .map_err(|e| GatewayError::Upstream(format!("secret {}/{}: {}", namespace, secret_name, e)))?;
        let raw = secret.get(ADMIN_SECRET_KEY).ok_or_else(|| {
            GatewayError::Upstream(format!(
                "secret {}/{} has no {} key",
                namespace, secret_name, ADMIN_SECRET_KEY
            ))
        })?;
        let credentials = Credentials::parse(raw)?;

        let collector = PostgresCollector::new(
            data_source(&credentials, &descriptor.instance_address),
            "",
            self.scrape_timeout,
        )?;

        CollectorSet::builder().register(Arc::new(collector))?.build()
    }
}
