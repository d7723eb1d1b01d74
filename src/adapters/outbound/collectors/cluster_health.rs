//! Elasticsearch Cluster Health Collector
//!
//! Scrapes `/_cluster/health` and exposes the cluster-level shard and node
//! counters.

use super::{fetch_json, ScrapeError};
use crate::domain::error::GatewayError;
use crate::domain::ports::Collector;
use async_trait::async_trait;
use prometheus::{Gauge, GaugeVec, IntCounter, Opts, Registry};
use serde::Deserialize;

const NAMESPACE: &str = "elasticsearch";
const SUBSYSTEM: &str = "cluster_health";
const COLORS: [&str; 3] = ["green", "yellow", "red"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClusterHealthResponse {
    cluster_name: String,
    status: String,
    number_of_nodes: f64,
    number_of_data_nodes: f64,
    active_primary_shards: f64,
    active_shards: f64,
    relocating_shards: f64,
    initializing_shards: f64,
    unassigned_shards: f64,
    delayed_unassigned_shards: f64,
    number_of_pending_tasks: f64,
}

struct ClusterHealthMetrics {
    up: Gauge,
    total_scrapes: IntCounter,
    json_parse_failures: IntCounter,
    number_of_nodes: GaugeVec,
    number_of_data_nodes: GaugeVec,
    active_primary_shards: GaugeVec,
    active_shards: GaugeVec,
    relocating_shards: GaugeVec,
    initializing_shards: GaugeVec,
    unassigned_shards: GaugeVec,
    delayed_unassigned_shards: GaugeVec,
    number_of_pending_tasks: GaugeVec,
    status: GaugeVec,
}

impl ClusterHealthMetrics {
    fn new() -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM);
        let per_cluster = |name: &str, help: &str| GaugeVec::new(opts(name, help), &["cluster"]);

        Ok(Self {
            up: Gauge::with_opts(opts("up", "Was the last scrape of the Elasticsearch cluster health endpoint successful."))?,
            total_scrapes: IntCounter::with_opts(opts("total_scrapes", "Current total Elasticsearch cluster health scrapes."))?,
            json_parse_failures: IntCounter::with_opts(opts("json_parse_failures", "Number of errors while parsing JSON."))?,
            number_of_nodes: per_cluster("number_of_nodes", "Number of nodes in the cluster.")?,
            number_of_data_nodes: per_cluster("number_of_data_nodes", "Number of data nodes in the cluster.")?,
            active_primary_shards: per_cluster("active_primary_shards", "The number of primary shards in your cluster.")?,
            active_shards: per_cluster("active_shards", "Aggregate total of all shards across all indices, including replicas.")?,
            relocating_shards: per_cluster("relocating_shards", "The number of shards that are currently moving from one node to another node.")?,
            initializing_shards: per_cluster("initializing_shards", "Count of shards that are being freshly created.")?,
            unassigned_shards: per_cluster("unassigned_shards", "The number of shards that exist in the cluster state, but cannot be found in the cluster itself.")?,
            delayed_unassigned_shards: per_cluster("delayed_unassigned_shards", "Shards delayed to reduce reallocation overhead.")?,
            number_of_pending_tasks: per_cluster("number_of_pending_tasks", "Cluster level changes which have not yet been executed.")?,
            status: GaugeVec::new(
                opts("status", "Whether all primary and replica shards are allocated."),
                &["cluster", "color"],
            )?,
        })
    }

    fn record(&self, health: &ClusterHealthResponse) {
        let cluster = [health.cluster_name.as_str()];
        self.number_of_nodes.with_label_values(&cluster).set(health.number_of_nodes);
        self.number_of_data_nodes.with_label_values(&cluster).set(health.number_of_data_nodes);
        self.active_primary_shards.with_label_values(&cluster).set(health.active_primary_shards);
        self.active_shards.with_label_values(&cluster).set(health.active_shards);
        self.relocating_shards.with_label_values(&cluster).set(health.relocating_shards);
        self.initializing_shards.with_label_values(&cluster).set(health.initializing_shards);
        self.unassigned_shards.with_label_values(&cluster).set(health.unassigned_shards);
        self.delayed_unassigned_shards.with_label_values(&cluster).set(health.delayed_unassigned_shards);
        self.number_of_pending_tasks.with_label_values(&cluster).set(health.number_of_pending_tasks);

        for color in COLORS {
            let value = if health.status == color { 1.0 } else { 0.0 };
            self.status
                .with_label_values(&[health.cluster_name.as_str(), color])
                .set(value);
        }
    }
}

/// Collector for the cluster health endpoint of one Elasticsearch node.
pub struct ClusterHealthCollector {
    client: reqwest::Client,
    url: reqwest::Url,
    endpoint: String,
    metrics: ClusterHealthMetrics,
}

impl ClusterHealthCollector {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Result<Self, GatewayError> {
        let url = super::endpoint_url(endpoint, "_cluster/health")?;
        Ok(Self {
            client,
            url,
            endpoint: endpoint.to_string(),
            metrics: ClusterHealthMetrics::new()?,
        })
    }
}

#[async_trait]
impl Collector for ClusterHealthCollector {
    fn name(&self) -> &'static str {
        "cluster_health"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        let m = &self.metrics;
        registry.register(Box::new(m.up.clone()))?;
        registry.register(Box::new(m.total_scrapes.clone()))?;
        registry.register(Box::new(m.json_parse_failures.clone()))?;
        for vec in [
            &m.number_of_nodes,
            &m.number_of_data_nodes,
            &m.active_primary_shards,
            &m.active_shards,
            &m.relocating_shards,
            &m.initializing_shards,
            &m.unassigned_shards,
            &m.delayed_unassigned_shards,
            &m.number_of_pending_tasks,
            &m.status,
        ] {
            registry.register(Box::new(vec.clone()))?;
        }
        Ok(())
    }

    async fn scrape(&self) {
        self.metrics.total_scrapes.inc();

        match fetch_json::<ClusterHealthResponse>(&self.client, self.url.clone()).await {
            Ok(health) => {
                self.metrics.up.set(1.0);
                self.metrics.record(&health);
            }
            Err(e) => {
                if matches!(e, ScrapeError::Decode(_)) {
                    self.metrics.json_parse_failures.inc();
                }
                tracing::warn!("failed to fetch cluster health from {}: {}", self.url, e);
                self.metrics.up.set(0.0);
            }
        }
    }
}
