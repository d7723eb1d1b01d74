//! Secret Store Port

use crate::domain::entities::SecretData;
use crate::domain::error::ClusterError;
use async_trait::async_trait;

/// Store holding connection credentials.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret and return its decoded sub-keys.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<SecretData, ClusterError>;
}
