// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Collection of applied manifests from a connected cluster

use crate::constants::{annotations, CLUSTER_COLLECTOR_NAME};
use crate::error::{ApidError, Result};
use crate::kubernetes::catalog::{ResourceCatalog, ResourceTypeRef};
use crate::kubernetes::discovery::DiscoveryCache;
use crate::types::{ClusterIdentity, RawManifest, Version};
use async_trait::async_trait;
use kube::api::{DynamicObject, ListParams};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// A source of raw manifests for one connected cluster
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    async fn collect(&self) -> Result<Vec<RawManifest>>;

    /// The collector's version capability, if it has one
    fn version_provider(&self) -> Option<&dyn VersionProvider> {
        None
    }
}

/// Reports the Kubernetes version of the connected cluster
#[async_trait]
pub trait VersionProvider: Send + Sync {
    async fn server_version(&self) -> Result<Version>;
}

/// Lists every catalog kind on one cluster and extracts applied configurations
pub struct ClusterCollector {
    client: Client,
    cluster: Arc<ClusterIdentity>,
    catalog: Arc<ResourceCatalog>,
    discovery: Arc<DiscoveryCache>,
    call_timeout: Duration,
}

impl ClusterCollector {
    pub fn new(
        client: Client,
        cluster: Arc<ClusterIdentity>,
        catalog: Arc<ResourceCatalog>,
        discovery: Arc<DiscoveryCache>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            client,
            cluster,
            catalog,
            discovery,
            call_timeout,
        }
    }

    /// Fixed kinds followed by the extension kinds this cluster serves
    async fn resource_types(&self) -> Vec<ResourceTypeRef> {
        let mut types = self.catalog.fixed().to_vec();

        if !self.catalog.extensions().is_empty() {
            let extensions = self
                .discovery
                .resolve_all(
                    &self.client,
                    &self.cluster.cache_key(),
                    self.catalog.extensions(),
                    self.call_timeout,
                )
                .await;
            types.extend(extensions);
        }

        types
    }

    /// The namespaces to list a type in; `None` means cluster-wide, empty means skip
    fn scopes(&self, resource: &ResourceTypeRef) -> Vec<Option<&str>> {
        if !self.cluster.is_namespace_restricted() {
            return vec![None];
        }

        if resource.namespaced {
            self.cluster.namespaces.iter().map(|ns| Some(ns.as_str())).collect()
        } else if self.cluster.cluster_resources {
            vec![None]
        } else {
            Vec::new()
        }
    }

    async fn list(&self, resource: &ResourceTypeRef, namespace: Option<&str>) -> Result<Vec<DynamicObject>> {
        let ar = resource.api_resource();
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };

        match timeout(self.call_timeout, api.list(&ListParams::default())).await {
            Err(_) => Err(ApidError::ClusterUnreachable),
            Ok(result) => Ok(result?.items),
        }
    }
}

#[async_trait]
impl Collector for ClusterCollector {
    fn name(&self) -> &str {
        CLUSTER_COLLECTOR_NAME
    }

    #[instrument(skip(self), fields(cluster = %self.cluster.name))]
    async fn collect(&self) -> Result<Vec<RawManifest>> {
        let mut results = Vec::new();

        for resource in self.resource_types().await {
            for namespace in self.scopes(&resource) {
                debug!("Retrieving: {} in {}", resource, namespace.unwrap_or("all namespaces"));

                let objects = match self.list(&resource, namespace).await {
                    Ok(objects) => objects,
                    Err(e) if is_connectivity_error(&e) => {
                        warn!("Failed to retrieve {}: {}", resource, e);
                        return Err(ApidError::ClusterUnreachable);
                    }
                    Err(e) => {
                        debug!("Failed to retrieve {}: {}", resource, e);
                        continue;
                    }
                };

                results.extend(objects.iter().filter_map(extract_manifest));
            }
        }

        info!("Retrieved {} resources from collector", results.len());
        Ok(results)
    }

    fn version_provider(&self) -> Option<&dyn VersionProvider> {
        Some(self)
    }
}

#[async_trait]
impl VersionProvider for ClusterCollector {
    async fn server_version(&self) -> Result<Version> {
        let info = match timeout(self.call_timeout, self.client.apiserver_version()).await {
            Err(_) => return Err(ApidError::ServerVersion("request timed out".to_string())),
            Ok(result) => result.map_err(|e| ApidError::ServerVersion(e.to_string()))?,
        };

        Version::from_info(&info).map_err(|e| ApidError::ServerVersion(e.to_string()))
    }
}

/// Decode the applied configuration of an object, if it has a well-formed one
pub fn extract_manifest(object: &DynamicObject) -> Option<RawManifest> {
    let payload = object
        .annotations()
        .get(annotations::LAST_APPLIED_CONFIGURATION)?;

    match serde_json::from_str::<RawManifest>(payload) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(
                "failed to parse '{}' annotation of resource {}/{}: {}",
                annotations::LAST_APPLIED_CONFIGURATION,
                object.namespace().unwrap_or_default(),
                object.name_any(),
                e
            );
            None
        }
    }
}

/// Check if an error means the cluster itself can't be reached, as opposed to
/// a single kind being unavailable
pub fn is_connectivity_error(error: &ApidError) -> bool {
    match error {
        ApidError::ClusterUnreachable => true,
        ApidError::KubeError(e) => is_kube_connectivity_error(e),
        _ => false,
    }
}

fn is_kube_connectivity_error(error: &kube::Error) -> bool {
    match error {
        kube::Error::Service(_) | kube::Error::HyperError(_) => true,
        kube::Error::Api(resp) => resp.code == 504 || resp.reason == "Timeout",
        // Client-go style request URLs carry the timeout as a query parameter
        other => other.to_string().contains("?timeout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        dynamic_list_json, k8s_status_json, make_identity, version_json, MockService,
    };
    use serde_json::json;
    use tower_test::mock;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn collector(client: Client, cluster: ClusterIdentity, catalog: ResourceCatalog) -> ClusterCollector {
        ClusterCollector::new(
            client,
            Arc::new(cluster),
            Arc::new(catalog),
            Arc::new(DiscoveryCache::new()),
            TIMEOUT,
        )
    }

    fn deployment(name: &str, applied: Option<&str>) -> serde_json::Value {
        let mut metadata = json!({"name": name, "namespace": "default"});
        if let Some(applied) = applied {
            metadata["annotations"] =
                json!({ annotations::LAST_APPLIED_CONFIGURATION: applied });
        }
        json!({"metadata": metadata})
    }

    #[test]
    fn test_extract_manifest_round_trips_payload() {
        let payload = json!({
            "apiVersion": "extensions/v1beta1",
            "kind": "Deployment",
            "metadata": {"name": "web", "labels": {"app": "web"}},
            "spec": {"replicas": 3, "template": {"spec": {"containers": [{"name": "web"}]}}}
        });
        let object: DynamicObject =
            serde_json::from_value(deployment("web", Some(&payload.to_string()))).unwrap();

        let manifest = extract_manifest(&object).unwrap();

        assert_eq!(serde_json::Value::Object(manifest), payload);
    }

    #[test]
    fn test_extract_manifest_skips_malformed_payload() {
        let object: DynamicObject =
            serde_json::from_value(deployment("web", Some("{not json"))).unwrap();
        assert!(extract_manifest(&object).is_none());

        let object: DynamicObject = serde_json::from_value(deployment("web", Some("[1, 2]"))).unwrap();
        assert!(extract_manifest(&object).is_none());
    }

    #[test]
    fn test_extract_manifest_without_annotation() {
        let object: DynamicObject = serde_json::from_value(deployment("web", None)).unwrap();
        assert!(extract_manifest(&object).is_none());
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(is_connectivity_error(&ApidError::ClusterUnreachable));
        assert!(is_connectivity_error(&ApidError::KubeError(kube::Error::Service(
            "connection refused".into()
        ))));

        let not_found = kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "the server could not find the requested resource".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        });
        assert!(!is_connectivity_error(&ApidError::KubeError(not_found)));

        let gateway_timeout = kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "the server was unable to return a response in the time allotted".to_string(),
            reason: "Timeout".to_string(),
            code: 504,
        });
        assert!(is_connectivity_error(&ApidError::KubeError(gateway_timeout)));
    }

    #[tokio::test]
    async fn test_collect_extracts_manifests_and_skips_bad_ones() {
        let good = json!({"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web"}});
        let mock = MockService::new()
            .on_get(
                "/apis/apps/v1/deployments",
                200,
                &dynamic_list_json(vec![
                    deployment("web", Some(&good.to_string())),
                    deployment("broken", Some("{oops")),
                    deployment("unmanaged", None),
                ]),
            )
            .on_get(
                "/apis/rbac.authorization.k8s.io/v1/clusterroles",
                403,
                &k8s_status_json(403, "Forbidden", "clusterroles is forbidden"),
            );
        let collector = collector(
            mock.into_client(),
            make_identity("prod", "https://1.2.3.4"),
            ResourceCatalog::default(),
        );

        let manifests = collector.collect().await.unwrap();

        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0]["kind"], "Deployment");
    }

    #[tokio::test]
    async fn test_collect_escalates_timeout_as_unreachable() {
        let mock = MockService::new().on_get_error(
            "/apis/networking.k8s.io/v1/networkpolicies",
            "request timed out: GET https://1.2.3.4/apis/networking.k8s.io/v1/networkpolicies?timeout=32s",
        );
        let collector = collector(
            mock.into_client(),
            make_identity("prod", "https://1.2.3.4"),
            ResourceCatalog::default(),
        );

        let err = collector.collect().await.unwrap_err();

        assert!(matches!(err, ApidError::ClusterUnreachable));
        assert_eq!(err.to_string(), "couldn't connect to the cluster; timeout error");
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_hung_list_is_unreachable() {
        let mock = MockService::new().on_get_hang("/apis/networking.k8s.io/v1/networkpolicies");
        let collector = collector(
            mock.clone().into_client(),
            make_identity("prod", "https://1.2.3.4"),
            ResourceCatalog::default(),
        );

        let err = collector.collect().await.unwrap_err();

        assert!(matches!(err, ApidError::ClusterUnreachable));
        assert_eq!(mock.hits("GET", "/apis/networking.k8s.io/v1/networkpolicies"), 1);
        // Collection stops at the unreachable kind
        assert_eq!(mock.hits("GET", "/apis/rbac.authorization.k8s.io/v1/clusterroles"), 0);
    }

    #[tokio::test]
    async fn test_collect_lists_restricted_namespaces_only() {
        let applied = json!({"apiVersion": "apps/v1", "kind": "Deployment"}).to_string();
        let mock = MockService::new()
            .on_get(
                "/apis/apps/v1/namespaces/team-a/deployments",
                200,
                &dynamic_list_json(vec![deployment("a", Some(&applied))]),
            )
            .on_get(
                "/apis/apps/v1/namespaces/team-b/deployments",
                200,
                &dynamic_list_json(vec![deployment("b", Some(&applied))]),
            );
        let mut cluster = make_identity("prod", "https://1.2.3.4");
        cluster.namespaces = vec!["team-a".to_string(), "team-b".to_string()];
        let collector = collector(mock.clone().into_client(), cluster, ResourceCatalog::default());

        let manifests = collector.collect().await.unwrap();

        assert_eq!(manifests.len(), 2);
        assert_eq!(mock.hits("GET", "/apis/apps/v1/deployments"), 0);
        assert_eq!(mock.hits("GET", "/apis/rbac.authorization.k8s.io/v1/clusterroles"), 0);
    }

    #[tokio::test]
    async fn test_collect_includes_resolved_extension_kinds() {
        let applied = json!({"apiVersion": "example.com/v1", "kind": "Widget"}).to_string();
        let mock = MockService::new()
            .on_get(
                "/apis/example.com/v1",
                200,
                &crate::test_utils::api_resource_list_json(
                    "example.com/v1",
                    &[("widgets", "Widget", true)],
                ),
            )
            .on_get(
                "/apis/example.com/v1/widgets",
                200,
                &dynamic_list_json(vec![deployment("w", Some(&applied))]),
            );
        let catalog = ResourceCatalog::from_additional_kinds(&["Widget.v1.example.com"]).unwrap();
        let collector = collector(
            mock.into_client(),
            make_identity("prod", "https://1.2.3.4"),
            catalog,
        );

        let manifests = collector.collect().await.unwrap();

        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0]["kind"], "Widget");
    }

    #[tokio::test]
    async fn test_server_version_from_single_probe() {
        let (service, mut handle) = mock::pair::<http::Request<kube::client::Body>, http::Response<kube::client::Body>>();
        let client = Client::new(service, "default");
        let collector = collector(
            client,
            make_identity("prod", "https://1.2.3.4"),
            ResourceCatalog::default(),
        );

        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.uri().path(), "/version");
            send.send_response(
                http::Response::builder()
                    .status(200)
                    .body(kube::client::Body::from(version_json("v1.25.4").into_bytes()))
                    .unwrap(),
            );
        });

        let version = collector.server_version().await.unwrap();
        server.await.unwrap();

        assert_eq!(version, Version::new(1, 25, 4));
        assert!(collector.version_provider().is_some());
    }
}
