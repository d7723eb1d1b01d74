mod backend_provisioner;
mod cluster_resource_client;
mod collector;
mod secret_store;

pub use backend_provisioner::BackendProvisioner;
pub use cluster_resource_client::ClusterResourceClient;
pub use collector::Collector;
pub use secret_store::SecretStore;
