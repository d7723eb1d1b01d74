//! Collector Set
//!
//! The group of collectors registered together for one provisioned
//! resource. Structure is fixed at construction; only sample values change.

use crate::domain::error::GatewayError;
use crate::domain::ports::Collector;
use prometheus::proto::MetricFamily;
use prometheus::Registry;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Collectors bound to one registry.
///
/// Always holds at least one collector: the builder refuses to produce an
/// empty set.
pub struct CollectorSet {
    registry: Registry,
    collectors: Vec<Arc<dyn Collector>>,
    /// Serializes scrapes so concurrent expositions do not hit the backend twice.
    scrape_lock: Mutex<()>,
}

impl CollectorSet {
    pub fn builder() -> CollectorSetBuilder {
        CollectorSetBuilder {
            registry: Registry::new(),
            collectors: Vec::new(),
        }
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn collectors(&self) -> &[Arc<dyn Collector>] {
        &self.collectors
    }

    /// Refresh every collector's samples concurrently.
    pub async fn scrape(&self) {
        let _guard = self.scrape_lock.lock().await;
        futures::future::join_all(self.collectors.iter().map(|c| c.scrape())).await;
    }

    /// Snapshot of the current metric families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl std::fmt::Debug for CollectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.collectors.iter().map(|c| c.name()).collect();
        f.debug_struct("CollectorSet")
            .field("collectors", &names)
            .finish()
    }
}

/// Builder registering collectors one at a time.
pub struct CollectorSetBuilder {
    registry: Registry,
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorSetBuilder {
    /// Register a collector's metrics. Duplicate metric names are rejected.
    pub fn register(mut self, collector: Arc<dyn Collector>) -> Result<Self, GatewayError> {
        collector.register(&self.registry)?;
        self.collectors.push(collector);
        Ok(self)
    }

    pub fn build(self) -> Result<CollectorSet, GatewayError> {
        if self.collectors.is_empty() {
            return Err(GatewayError::Upstream(
                "collector set has no collectors".to_string(),
            ));
        }
        Ok(CollectorSet {
            registry: self.registry,
            collectors: self.collectors,
            scrape_lock: Mutex::new(()),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prometheus::IntCounter;

    struct CountingCollector {
        scrapes: IntCounter,
    }

    impl CountingCollector {
        fn new(name: &str) -> Self {
            Self {
                scrapes: IntCounter::new(name, "scrape count").unwrap(),
            }
        }
    }

    #[async_trait]
    impl Collector for CountingCollector {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn endpoint(&self) -> &str {
            "test://"
        }

        fn register(&self, registry: &Registry) -> prometheus::Result<()> {
            registry.register(Box::new(self.scrapes.clone()))
        }

        async fn scrape(&self) {
            self.scrapes.inc();
        }
    }

    #[test]
    fn test_empty_set_rejected() {
        let err = CollectorSet::builder().build().unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let result = CollectorSet::builder()
            .register(Arc::new(CountingCollector::new("dup_total")))
            .unwrap()
            .register(Arc::new(CountingCollector::new("dup_total")));
        assert!(matches!(result, Err(GatewayError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_scrape_refreshes_every_collector() {
        let set = CollectorSet::builder()
            .register(Arc::new(CountingCollector::new("a_total")))
            .unwrap()
            .register(Arc::new(CountingCollector::new("b_total")))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(set.len(), 2);

        set.scrape().await;
        set.scrape().await;

        let families = set.gather();
        assert_eq!(families.len(), 2);
        for family in families {
            assert_eq!(family.get_metric()[0].get_counter().get_value(), 2.0);
        }
    }
}
