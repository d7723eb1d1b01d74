//! Error taxonomy
//!
//! Every fault that can reach the HTTP boundary is a `GatewayError`.
//! Cluster-side faults are reported by the ports as `ClusterError` and
//! folded into the gateway taxonomy at the provisioner.

/// Errors reported by the cluster resource client and the secret store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The requested object does not exist.
    #[error("not found")]
    NotFound,
    /// Any other API failure (transport, auth, decoding).
    #[error("cluster api error: {0}")]
    Api(String),
}

/// Errors surfaced by the gateway.
///
/// `Clone` so that a single failed provisioning attempt can be delivered to
/// every request that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// A required path parameter was absent or empty.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
    /// The cluster API reported the named resource as absent.
    #[error("resource not found")]
    ResourceNotFound,
    /// No provisioner is registered for the requested backend kind.
    #[error("unknown backend kind: {0}")]
    UnknownBackendKind(String),
    /// Secret fetch, credential parsing or collector construction failed.
    #[error("{0}")]
    Upstream(String),
}

impl GatewayError {
    pub fn upstream(detail: impl std::fmt::Display) -> Self {
        Self::Upstream(detail.to_string())
    }
}

impl From<ClusterError> for GatewayError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::NotFound => Self::ResourceNotFound,
            ClusterError::Api(detail) => Self::Upstream(detail),
        }
    }
}

impl From<prometheus::Error> for GatewayError {
    fn from(err: prometheus::Error) -> Self {
        Self::Upstream(format!("metrics registry: {}", err))
    }
}
