//! Kubernetes API Client
//!
//! Implements `ClusterResourceClient` and `SecretStore` over the Kubernetes
//! REST API. Runs with the pod's service-account token when one is mounted.

use crate::domain::entities::{ElasticsearchRecord, PostgresRecord, SecretData};
use crate::domain::error::ClusterError;
use crate::domain::ports::{ClusterResourceClient, SecretStore};
use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

/// API group serving the database resources.
const RESOURCE_GROUP: &str = "kubedb.com";
const RESOURCE_VERSION: &str = "v1alpha1";
const POSTGRES_PLURAL: &str = "postgreses";
const ELASTICSEARCH_PLURAL: &str = "elastics";

/// Connection settings for the Kubernetes API.
#[derive(Debug, Clone)]
pub struct KubeApiConfig {
    /// Base URL, e.g. `https://kubernetes.default.svc`
    pub api_url: String,
    /// Bearer token file (service-account token)
    pub token_path: Option<String>,
    /// PEM bundle used to verify the API server
    pub ca_path: Option<String>,
    /// Skip TLS verification (development clusters only)
    pub insecure: bool,
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    #[serde(default)]
    data: BTreeMap<String, String>,
}

/// Kubernetes-backed resource client and secret store.
#[derive(Clone)]
pub struct KubeApiClient {
    client: reqwest::Client,
    api_url: reqwest::Url,
    token: Option<String>,
}

impl KubeApiClient {
    /// Create a client from an already-built HTTP client.
    pub fn new(
        client: reqwest::Client,
        api_url: &str,
        token: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_url = reqwest::Url::parse(api_url)?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("kubernetes api url cannot be a base: {}", api_url);
        }
        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// Build a client from configuration, reading the token and CA files.
    ///
    /// A configured but missing token file is tolerated so the gateway can
    /// run against an unauthenticated API proxy.
    pub fn from_config(cfg: &KubeApiConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(ca_path) = &cfg.ca_path {
            match std::fs::read(ca_path) {
                Ok(pem) => {
                    builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
                }
                Err(e) => {
                    tracing::warn!("kubernetes CA bundle {} not loaded: {}", ca_path, e);
                }
            }
        }
        if cfg.insecure {
            tracing::warn!("TLS verification disabled for kubernetes api");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let token = match &cfg.token_path {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(token) => Some(token.trim().to_string()),
                Err(e) => {
                    tracing::warn!("kubernetes token {} not loaded: {}", path, e);
                    None
                }
            },
            None => None,
        };

        Self::new(builder.build()?, &cfg.api_url, token)
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, ClusterError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClusterError::Api(format!("invalid api url: {}", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn resource_url(&self, namespace: &str, plural: &str, name: &str) -> Result<reqwest::Url, ClusterError> {
        self.url(&[
            "apis",
            RESOURCE_GROUP,
            RESOURCE_VERSION,
            "namespaces",
            namespace,
            plural,
            name,
        ])
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, ClusterError> {
        let mut req = self.client.get(url.clone());
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ClusterError::Api(format!("GET {}: {}", url.path(), e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::Api(format!(
                "GET {}: {}: {}",
                url.path(),
                status,
                body.trim()
            )));
        }

        resp.json()
            .await
            .map_err(|e| ClusterError::Api(format!("GET {}: decode: {}", url.path(), e)))
    }
}

#[async_trait]
impl ClusterResourceClient for KubeApiClient {
    async fn get_postgres(&self, namespace: &str, name: &str) -> Result<PostgresRecord, ClusterError> {
        let url = self.resource_url(namespace, POSTGRES_PLURAL, name)?;
        self.get_json(url).await
    }

    async fn get_elasticsearch(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ElasticsearchRecord, ClusterError> {
        let url = self.resource_url(namespace, ELASTICSEARCH_PLURAL, name)?;
        self.get_json(url).await
    }
}

#[async_trait]
impl SecretStore for KubeApiClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<SecretData, ClusterError> {
        let url = self.url(&["api", "v1", "namespaces", namespace, "secrets", name])?;
        let secret: SecretResponse = self.get_json(url).await?;

        secret
            .data
            .into_iter()
            .map(|(key, encoded)| {
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.as_bytes())
                    .map(|bytes| (key.clone(), bytes))
                    .map_err(|e| {
                        ClusterError::Api(format!("secret {}/{} key {}: {}", namespace, name, key, e))
                    })
            })
            .collect()
    }
}
