//! Gateway API Server
//!
//! HTTP surface of the gateway. `GET` on a resource path serves its metrics,
//! provisioning a collector set on first use; `DELETE` on the same path
//! evicts the cached set.

use crate::application::{EvictionHandler, ExportRequest, RequestDispatcher};
use crate::domain::error::GatewayError;
use crate::domain::services::CollectorCache;
use crate::infrastructure::ShutdownController;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Prefix of every resource path. The remainder is `{namespace}/{type}/{name}`.
pub const ROUTE_PREFIX: &str = "/kubedb.com/v1alpha1/namespaces";

/// Query parameters of a resource request.
///
/// Kept as raw pairs so a repeated key is not a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ExportQuery(Vec<(String, String)>);

impl ExportQuery {
    /// Address of the instance to scrape. The first `pod` wins.
    pub fn pod(&self) -> Option<String> {
        self.0
            .iter()
            .find(|(key, _)| key == "pod")
            .map(|(_, value)| value.clone())
    }
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_collectors: usize,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub eviction: Arc<EvictionHandler>,
    /// Shared with the dispatcher and eviction handler; read for `/health`
    pub cache: Arc<CollectorCache>,
}

impl ApiState {
    pub fn new(dispatcher: Arc<RequestDispatcher>, cache: Arc<CollectorCache>) -> Self {
        Self {
            dispatcher,
            eviction: Arc::new(EvictionHandler::new(cache.clone())),
            cache,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::MissingParameter(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            GatewayError::ResourceNotFound | GatewayError::UnknownBackendKind(_) => {
                StatusCode::NOT_FOUND.into_response()
            }
            GatewayError::Upstream(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

/// Build the gateway router over `state`.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            &format!("{}/*resource", ROUTE_PREFIX),
            get(export_handler).delete(evict_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Gateway HTTP server.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    /// Get shared state for use by other components.
    pub fn state(&self) -> ApiState {
        self.state.clone()
    }

    /// Run the API server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("metrics gateway listening on {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        tracing::info!("metrics gateway stopped");
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_collectors: state.cache.len(),
    })
}

async fn export_handler(
    State(state): State<ApiState>,
    uri: Uri,
    Path(resource): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let Some(request) = ExportRequest::from_resource_path(&resource, query.pod()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.dispatcher.export(uri.path(), request).await {
        Ok(body) => (
            [(header::CONTENT_TYPE, state.dispatcher.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::debug!("export {} failed: {}", uri.path(), e);
            e.into_response()
        }
    }
}

async fn evict_handler(State(state): State<ApiState>, uri: Uri) -> StatusCode {
    state.eviction.evict(uri.path());
    StatusCode::OK
}
