//! Request Dispatcher - Main application use case
//!
//! Validates an export request, picks the provisioner for its backend kind,
//! drives the collector cache and renders the resulting set.

use crate::application::exposition::ExpositionServer;
use crate::domain::entities::ResourceDescriptor;
use crate::domain::error::GatewayError;
use crate::domain::ports::BackendProvisioner;
use crate::domain::services::CollectorCache;
use crate::domain::value_objects::BackendKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup table from backend kind to provisioner.
#[derive(Default, Clone)]
pub struct ProvisionerRegistry {
    provisioners: HashMap<BackendKind, Arc<dyn BackendProvisioner>>,
}

impl ProvisionerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provisioner` under its own kind, replacing any previous one.
    pub fn register(mut self, provisioner: Arc<dyn BackendProvisioner>) -> Self {
        self.provisioners.insert(provisioner.kind(), provisioner);
        self
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn BackendProvisioner>> {
        self.provisioners.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.provisioners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provisioners.is_empty()
    }
}

/// Raw parameters of an export request, as extracted from the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    pub namespace: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub pod: Option<String>,
}

impl ExportRequest {
    /// Split a `{namespace}/{type}/{name}` resource path.
    ///
    /// Empty segments become `None`. Returns `None` when the path has more
    /// than three segments.
    pub fn from_resource_path(resource: &str, pod: Option<String>) -> Option<Self> {
        let mut segments = resource.split('/');
        let mut next = || {
            segments
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let request = Self {
            namespace: next(),
            kind: next(),
            name: next(),
            pod,
        };
        if segments.next().is_some() {
            return None;
        }
        Some(request)
    }
}

/// Main use case of the gateway.
pub struct RequestDispatcher {
    registry: ProvisionerRegistry,
    cache: Arc<CollectorCache>,
    exposition: ExpositionServer,
}

impl RequestDispatcher {
    pub fn new(registry: ProvisionerRegistry, cache: Arc<CollectorCache>) -> Self {
        Self {
            registry,
            cache,
            exposition: ExpositionServer::new(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.exposition.content_type()
    }

    /// Validate `request` and turn it into a descriptor plus its provisioner.
    ///
    /// Parameters are checked in order: namespace, type, name. Nothing is
    /// provisioned or cached here.
    pub fn resolve(
        &self,
        request: ExportRequest,
    ) -> Result<(ResourceDescriptor, Arc<dyn BackendProvisioner>), GatewayError> {
        let namespace = request
            .namespace
            .ok_or(GatewayError::MissingParameter("namespace"))?;
        let kind = request.kind.ok_or(GatewayError::MissingParameter("type"))?;
        let name = request.name.ok_or(GatewayError::MissingParameter("name"))?;

        let provisioner = BackendKind::parse(&kind)
            .and_then(|k| self.registry.get(k))
            .ok_or(GatewayError::UnknownBackendKind(kind))?;

        let descriptor = ResourceDescriptor::new(
            namespace,
            provisioner.kind(),
            name,
            request.pod.as_deref(),
        );
        Ok((descriptor, provisioner))
    }

    /// Serve the exposition for `request`, provisioning under `path` on first use.
    pub async fn export(&self, path: &str, request: ExportRequest) -> Result<String, GatewayError> {
        let (descriptor, provisioner) = self.resolve(request)?;

        let set = self
            .cache
            .get_or_create(path, || async move { provisioner.provision(&descriptor).await })
            .await?;

        self.exposition.render(&set).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::collector_set::CollectorSet;
    use crate::domain::ports::Collector;
    use async_trait::async_trait;
    use prometheus::{Gauge, Registry};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ===== Mock Implementations =====

    struct StaticCollector {
        up: Gauge,
    }

    #[async_trait]
    impl Collector for StaticCollector {
        fn name(&self) -> &'static str {
            "static"
        }

        fn endpoint(&self) -> &str {
            "test://static"
        }

        fn register(&self, registry: &Registry) -> prometheus::Result<()> {
            registry.register(Box::new(self.up.clone()))
        }

        async fn scrape(&self) {
            self.up.set(1.0);
        }
    }

    struct MockProvisioner {
        kind: BackendKind,
        calls: AtomicUsize,
        fail_with: Option<GatewayError>,
    }

    impl MockProvisioner {
        fn new(kind: BackendKind) -> Self {
            Self {
                kind,
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(kind: BackendKind, err: GatewayError) -> Self {
            Self {
                fail_with: Some(err),
                ..Self::new(kind)
            }
        }
    }

    #[async_trait]
    impl BackendProvisioner for MockProvisioner {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn provision(
            &self,
            _descriptor: &ResourceDescriptor,
        ) -> Result<CollectorSet, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            let collector = StaticCollector {
                up: Gauge::new("static_up", "Always up.").unwrap(),
            };
            CollectorSet::builder().register(Arc::new(collector))?.build()
        }
    }

    fn dispatcher(provisioner: Arc<MockProvisioner>) -> (RequestDispatcher, Arc<CollectorCache>) {
        let cache = Arc::new(CollectorCache::new());
        let registry = ProvisionerRegistry::new().register(provisioner);
        (RequestDispatcher::new(registry, cache.clone()), cache)
    }

    fn request(ns: &str, kind: &str, name: &str) -> ExportRequest {
        ExportRequest::from_resource_path(&format!("{}/{}/{}", ns, kind, name), None).unwrap()
    }

    // ===== Tests =====

    #[test]
    fn test_from_resource_path() {
        let req = ExportRequest::from_resource_path("ns1/postgres/pg1", Some("10.0.0.5".into())).unwrap();
        assert_eq!(req.namespace.as_deref(), Some("ns1"));
        assert_eq!(req.kind.as_deref(), Some("postgres"));
        assert_eq!(req.name.as_deref(), Some("pg1"));
        assert_eq!(req.pod.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_from_resource_path_empty_segments() {
        let req = ExportRequest::from_resource_path("/postgres/pg1", None).unwrap();
        assert_eq!(req.namespace, None);
        assert_eq!(req.kind.as_deref(), Some("postgres"));

        let req = ExportRequest::from_resource_path("ns1//pg1", None).unwrap();
        assert_eq!(req.kind, None);

        let req = ExportRequest::from_resource_path("ns1/postgres/", None).unwrap();
        assert_eq!(req.name, None);

        let req = ExportRequest::from_resource_path("ns1", None).unwrap();
        assert_eq!(req.kind, None);
        assert_eq!(req.name, None);
    }

    #[test]
    fn test_from_resource_path_rejects_extra_segments() {
        assert!(ExportRequest::from_resource_path("ns1/postgres/pg1/extra", None).is_none());
    }

    #[test]
    fn test_resolve_checks_parameters_in_order() {
        let (d, _) = dispatcher(Arc::new(MockProvisioner::new(BackendKind::Postgres)));

        let err = d.resolve(ExportRequest::default()).err().unwrap();
        assert_eq!(err, GatewayError::MissingParameter("namespace"));

        let err = d
            .resolve(ExportRequest {
                namespace: Some("ns1".into()),
                ..Default::default()
            })
            .err()
            .unwrap();
        assert_eq!(err, GatewayError::MissingParameter("type"));

        let err = d
            .resolve(ExportRequest {
                namespace: Some("ns1".into()),
                kind: Some("postgres".into()),
                ..Default::default()
            })
            .err()
            .unwrap();
        assert_eq!(err, GatewayError::MissingParameter("name"));
    }

    #[test]
    fn test_resolve_unknown_kind() {
        let (d, _) = dispatcher(Arc::new(MockProvisioner::new(BackendKind::Postgres)));
        let err = d.resolve(request("ns1", "mysql", "db1")).err().unwrap();
        assert_eq!(err, GatewayError::UnknownBackendKind("mysql".to_string()));
    }

    #[test]
    fn test_resolve_known_kind_without_provisioner() {
        let (d, _) = dispatcher(Arc::new(MockProvisioner::new(BackendKind::Postgres)));
        let err = d.resolve(request("ns1", "elasticsearch", "es1")).err().unwrap();
        assert_eq!(err, GatewayError::UnknownBackendKind("elasticsearch".to_string()));
    }

    #[test]
    fn test_resolve_defaults_pod_address() {
        let (d, _) = dispatcher(Arc::new(MockProvisioner::new(BackendKind::Postgres)));
        let (descriptor, provisioner) = d.resolve(request("ns1", "postgreses", "pg1")).unwrap();
        assert_eq!(descriptor.instance_address, "127.0.0.1");
        assert_eq!(descriptor.kind, BackendKind::Postgres);
        assert_eq!(provisioner.kind(), BackendKind::Postgres);
    }

    #[tokio::test]
    async fn test_export_caches_by_path() {
        let provisioner = Arc::new(MockProvisioner::new(BackendKind::Postgres));
        let (d, cache) = dispatcher(provisioner.clone());
        let path = "/kubedb.com/v1alpha1/namespaces/ns1/postgres/pg1";

        let body = d.export(path, request("ns1", "postgres", "pg1")).await.unwrap();
        assert!(body.contains("static_up 1"));
        d.export(path, request("ns1", "postgres", "pg1")).await.unwrap();

        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(path));
    }

    #[tokio::test]
    async fn test_export_failure_not_cached() {
        let provisioner = Arc::new(MockProvisioner::failing(
            BackendKind::Postgres,
            GatewayError::ResourceNotFound,
        ));
        let (d, cache) = dispatcher(provisioner.clone());
        let path = "/kubedb.com/v1alpha1/namespaces/ns1/postgres/missing";

        for _ in 0..2 {
            let err = d.export(path, request("ns1", "postgres", "missing")).await.unwrap_err();
            assert_eq!(err, GatewayError::ResourceNotFound);
        }
        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_never_touch_cache() {
        let provisioner = Arc::new(MockProvisioner::new(BackendKind::Postgres));
        let (d, cache) = dispatcher(provisioner.clone());

        let err = d
            .export("/x", request("ns1", "redis", "r1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownBackendKind(_)));
        assert_eq!(provisioner.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProvisionerRegistry::new()
            .register(Arc::new(MockProvisioner::new(BackendKind::Postgres)))
            .register(Arc::new(MockProvisioner::new(BackendKind::Elasticsearch)));
        assert_eq!(registry.len(), 2);
        assert!(registry.get(BackendKind::Elasticsearch).is_some());
        assert!(ProvisionerRegistry::new().is_empty());
    }
}
