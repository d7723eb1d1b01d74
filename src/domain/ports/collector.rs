//! Collector Port
//!
//! A collector owns a group of Prometheus metrics for one monitored aspect
//! of a resource and refreshes their values from the backend on demand.

use async_trait::async_trait;
use prometheus::Registry;

#[async_trait]
pub trait Collector: Send + Sync {
    /// Short identifier, e.g. `"cluster_health"`.
    fn name(&self) -> &'static str;

    /// Endpoint this collector scrapes.
    fn endpoint(&self) -> &str;

    /// Register every metric this collector owns with `registry`.
    fn register(&self, registry: &Registry) -> prometheus::Result<()>;

    /// Refresh sample values from the backend.
    ///
    /// Failures are recorded in the collector's own `up` gauge rather than
    /// returned, so one unreachable backend never fails an exposition.
    async fn scrape(&self);
}
