//! Backend Collectors
//!
//! Implementations of the `Collector` port. Each one owns its Prometheus
//! metrics and refreshes them from the backend when scraped.

mod cluster_health;
mod nodes;
mod postgres;

pub use cluster_health::ClusterHealthCollector;
pub use nodes::NodesCollector;
pub use postgres::PostgresCollector;

use crate::domain::error::GatewayError;
use serde::de::DeserializeOwned;

/// Why a single scrape failed.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),
    #[error("scrape timed out")]
    Timeout,
}

/// GET `url` and decode the body as JSON.
///
/// Decoding is done separately from the transfer so callers can count
/// parse failures on their own.
async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: reqwest::Url,
) -> Result<T, ScrapeError> {
    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(ScrapeError::Status(resp.status()));
    }
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Resolve `path` against an HTTP endpoint such as `http://10.0.0.5:9200`.
fn endpoint_url(endpoint: &str, path: &str) -> Result<reqwest::Url, GatewayError> {
    reqwest::Url::parse(endpoint)
        .and_then(|base| base.join(path))
        .map_err(|e| GatewayError::Upstream(format!("invalid endpoint {}: {}", endpoint, e)))
}
