//! Exposition Server
//!
//! Refreshes a collector set and renders its samples in the Prometheus text
//! exposition format. Output is never cached; every call scrapes.

use crate::domain::collector_set::CollectorSet;
use crate::domain::error::GatewayError;
use prometheus::{Encoder, TextEncoder};

/// Content type of the rendered output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

#[derive(Debug, Default, Clone, Copy)]
pub struct ExpositionServer;

impl ExpositionServer {
    pub fn new() -> Self {
        Self
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// Scrape every collector in `set` and encode the gathered families.
    pub async fn render(&self, set: &CollectorSet) -> Result<String, GatewayError> {
        set.scrape().await;

        let families = set.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(GatewayError::upstream)
    }
}
