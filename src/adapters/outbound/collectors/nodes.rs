//! Elasticsearch Nodes Collector
//!
//! Scrapes node stats. By default only the node behind the endpoint is
//! queried (`/_nodes/_local/stats`); with `all_nodes` every node in the
//! cluster is (`/_nodes/stats`).

use super::{fetch_json, ScrapeError};
use crate::domain::error::GatewayError;
use crate::domain::ports::Collector;
use async_trait::async_trait;
use prometheus::{Gauge, GaugeVec, IntCounter, Opts, Registry};
use serde::Deserialize;
use std::collections::HashMap;

const NAMESPACE: &str = "elasticsearch";
const NODE_LABELS: [&str; 3] = ["cluster", "host", "name"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodesStatsResponse {
    cluster_name: String,
    nodes: HashMap<String, NodeStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeStats {
    name: String,
    host: String,
    indices: IndicesStats,
    jvm: JvmStats,
    process: ProcessStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndicesStats {
    docs: DocsStats,
    store: StoreStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocsStats {
    count: f64,
    deleted: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoreStats {
    size_in_bytes: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JvmStats {
    mem: JvmMemStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JvmMemStats {
    heap_used_in_bytes: f64,
    heap_max_in_bytes: f64,
    non_heap_used_in_bytes: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProcessStats {
    cpu: ProcessCpuStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProcessCpuStats {
    percent: f64,
}

struct NodesMetrics {
    up: Gauge,
    total_scrapes: IntCounter,
    json_parse_failures: IntCounter,
    docs: GaugeVec,
    docs_deleted: GaugeVec,
    store_size: GaugeVec,
    jvm_memory_used: GaugeVec,
    jvm_memory_max: GaugeVec,
    cpu_percent: GaugeVec,
}

impl NodesMetrics {
    fn new() -> prometheus::Result<Self> {
        let scrape = |name: &str, help: &str| Opts::new(name, help).namespace(NAMESPACE).subsystem("node_stats");
        let per_node = |subsystem: &str, name: &str, help: &str| {
            GaugeVec::new(
                Opts::new(name, help).namespace(NAMESPACE).subsystem(subsystem),
                &NODE_LABELS,
            )
        };
        let jvm_memory = |name: &str, help: &str| {
            GaugeVec::new(
                Opts::new(name, help).namespace(NAMESPACE).subsystem("jvm_memory"),
                &["cluster", "host", "name", "area"],
            )
        };

        Ok(Self {
            up: Gauge::with_opts(scrape("up", "Was the last scrape of the Elasticsearch nodes endpoint successful."))?,
            total_scrapes: IntCounter::with_opts(scrape("total_scrapes", "Current total Elasticsearch node scrapes."))?,
            json_parse_failures: IntCounter::with_opts(scrape("json_parse_failures", "Number of errors while parsing JSON."))?,
            docs: per_node("indices", "docs", "Count of documents on this node.")?,
            docs_deleted: per_node("indices", "docs_deleted", "Count of deleted documents on this node.")?,
            store_size: per_node("indices_store", "size_bytes", "Current size of stored index data in bytes.")?,
            jvm_memory_used: jvm_memory("used_bytes", "JVM memory currently used by area.")?,
            jvm_memory_max: jvm_memory("max_bytes", "JVM memory max.")?,
            cpu_percent: per_node("process", "cpu_percent", "Percent CPU used by process.")?,
        })
    }

    fn record(&self, stats: &NodesStatsResponse) {
        for vec in [
            &self.docs,
            &self.docs_deleted,
            &self.store_size,
            &self.jvm_memory_used,
            &self.jvm_memory_max,
            &self.cpu_percent,
        ] {
            vec.reset();
        }

        for node in stats.nodes.values() {
            let labels = [
                stats.cluster_name.as_str(),
                node.host.as_str(),
                node.name.as_str(),
            ];
            self.docs.with_label_values(&labels).set(node.indices.docs.count);
            self.docs_deleted.with_label_values(&labels).set(node.indices.docs.deleted);
            self.store_size.with_label_values(&labels).set(node.indices.store.size_in_bytes);
            self.cpu_percent.with_label_values(&labels).set(node.process.cpu.percent);

            let heap = [labels[0], labels[1], labels[2], "heap"];
            let non_heap = [labels[0], labels[1], labels[2], "non-heap"];
            self.jvm_memory_used.with_label_values(&heap).set(node.jvm.mem.heap_used_in_bytes);
            self.jvm_memory_used.with_label_values(&non_heap).set(node.jvm.mem.non_heap_used_in_bytes);
            self.jvm_memory_max.with_label_values(&heap).set(node.jvm.mem.heap_max_in_bytes);
        }
    }
}

/// Collector for node statistics of an Elasticsearch cluster.
pub struct NodesCollector {
    client: reqwest::Client,
    url: reqwest::Url,
    endpoint: String,
    all_nodes: bool,
    metrics: NodesMetrics,
}

impl NodesCollector {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        all_nodes: bool,
    ) -> Result<Self, GatewayError> {
        let path = if all_nodes {
            "_nodes/stats"
        } else {
            "_nodes/_local/stats"
        };
        let url = super::endpoint_url(endpoint, path)?;
        Ok(Self {
            client,
            url,
            endpoint: endpoint.to_string(),
            all_nodes,
            metrics: NodesMetrics::new()?,
        })
    }

    pub fn all_nodes(&self) -> bool {
        self.all_nodes
    }
}

#[async_trait]
impl Collector for NodesCollector {
    fn name(&self) -> &'static str {
        "nodes"
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
            &m.docs,
            &m.docs_deleted,
            &m.store_size,
            &m.jvm_memory_used,
            &m.jvm_memory_max,
            &m.cpu_percent,
        ] {
            registry.register(Box::new(vec.clone()))?;
        }
        Ok(())
    }

    async fn scrape(&self) {
        self.metrics.total_scrapes.inc();

        match fetch_json::<NodesStatsResponse>(&self.client, self.url.clone()).await {
            Ok(stats) => {
                self.metrics.up.set(1.0);
                self.metrics.record(&stats);
            }
            Err(e) => {
                if matches!(e, ScrapeError::Decode(_)) {
                    self.metrics.json_parse_failures.inc();
                }
                tracing::warn!("failed to fetch node stats from {}: {}", self.url, e);
                self.metrics.up.set(0.0);
            }
        }
    }
}
