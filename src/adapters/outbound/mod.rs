pub mod collectors;
mod dashmap_cluster;
mod elasticsearch_provisioner;
mod kube_api_client;
mod postgres_provisioner;

pub use dashmap_cluster::DashMapCluster;
pub use elasticsearch_provisioner::{ElasticsearchProvisioner, ELASTICSEARCH_TIMEOUT};
pub use kube_api_client::{KubeApiClient, KubeApiConfig};
pub use postgres_provisioner::{data_source, PostgresProvisioner, ADMIN_SECRET_KEY};
