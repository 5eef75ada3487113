// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use crate::error::{ApidError, Result};
use crate::kubernetes::ClusterConnector;
use crate::types::{ClusterConfig, ClusterIdentity, ConnectionDescriptor, ConnectionState};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

#[derive(Clone)]
enum Reply {
    Json(u16, String),
    Error(String),
    Hang,
}

type Key = (String, String);

/// A mock HTTP service that returns predefined responses for exact request paths
/// and counts every request it sees.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<Key, Reply>>>,
    hits: Arc<Mutex<HashMap<Key, usize>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            ("GET".to_string(), path.to_string()),
            Reply::Json(status, body.to_string()),
        );
        self
    }

    /// Fail GET requests on the path at the transport level
    pub fn on_get_error(self, path: &str, message: &str) -> Self {
        self.responses.lock().unwrap().insert(
            ("GET".to_string(), path.to_string()),
            Reply::Error(message.to_string()),
        );
        self
    }

    /// Never answer GET requests on the path
    pub fn on_get_hang(self, path: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), Reply::Hang);
        self
    }

    /// Number of requests seen for a method and path
    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let key = (req.method().to_string(), req.uri().path().to_string());

        *self.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        let reply = self.responses.lock().unwrap().get(&key).cloned();

        Box::pin(async move {
            match reply {
                Some(Reply::Json(status, body)) => Ok(json_response(status, body)),
                Some(Reply::Error(message)) => Err(message.into()),
                Some(Reply::Hang) => std::future::pending().await,
                // Default 404 for unmatched requests
                None => Ok(json_response(
                    404,
                    k8s_status_json(404, "NotFound", "the server could not find the requested resource"),
                )),
            }
        })
    }
}

fn json_response(status: u16, body: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.into_bytes()))
        .unwrap()
}

/// Connects each identity by name to a prepared client
#[derive(Clone, Default)]
pub struct StaticConnector {
    clients: HashMap<String, Client>,
}

impl StaticConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, cluster: &str, client: Client) -> Self {
        self.clients.insert(cluster.to_string(), client);
        self
    }
}

#[async_trait]
impl ClusterConnector for StaticConnector {
    async fn connect(&self, cluster: &ClusterIdentity) -> Result<Client> {
        self.clients
            .get(&cluster.name)
            .cloned()
            .ok_or_else(|| ApidError::KubeconfigError(format!("no client for {}", cluster.name)))
    }
}

/// A Kubernetes Status failure body
pub fn k8s_status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// A `/version` response for the given git version
pub fn version_json(git_version: &str) -> String {
    let core = git_version.trim_start_matches('v');
    let mut parts = core.split('.');
    let major = parts.next().unwrap_or("1");
    let minor = parts.next().unwrap_or("0");
    serde_json::json!({
        "major": major,
        "minor": minor,
        "gitVersion": git_version,
        "gitCommit": "0000000000000000000000000000000000000000",
        "gitTreeState": "clean",
        "buildDate": "2026-01-01T00:00:00Z",
        "goVersion": "go1.22.0",
        "compiler": "gc",
        "platform": "linux/amd64"
    })
    .to_string()
}

/// A cluster secret in the `argocd` namespace with the given data fields
pub fn make_cluster_secret(name: &str, data: &[(&str, &str)]) -> Secret {
    let labels = BTreeMap::from([(
        crate::constants::labels::SECRET_TYPE.to_string(),
        crate::constants::labels::SECRET_TYPE_CLUSTER.to_string(),
    )]);

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("argocd".to_string()),
            uid: Some(format!("uid-{}", name)),
            labels: Some(labels),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn secret_list_json(secrets: &[Secret]) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "SecretList",
        "metadata": {"resourceVersion": "1"},
        "items": secrets
    })
    .to_string()
}

/// An unrestricted remote cluster identity
pub fn make_identity(name: &str, server: &str) -> ClusterIdentity {
    ClusterIdentity {
        name: name.to_string(),
        id: format!("id-{}", name),
        connection: ConnectionDescriptor::new(server, ClusterConfig::default()),
        namespaces: Vec::new(),
        cluster_resources: false,
        shard: None,
        server_version: None,
        connection_state: ConnectionState::default(),
    }
}

/// A list response of arbitrary objects
pub fn dynamic_list_json(items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "List",
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

/// An `APIResourceList` discovery response; resources are `(name, kind, namespaced)`
pub fn api_resource_list_json(group_version: &str, resources: &[(&str, &str, bool)]) -> String {
    let resources: Vec<serde_json::Value> = resources
        .iter()
        .map(|(name, kind, namespaced)| {
            serde_json::json!({
                "name": name,
                "singularName": "",
                "namespaced": namespaced,
                "kind": kind,
                "verbs": ["get", "list", "watch"]
            })
        })
        .collect();

    serde_json::json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
    .to_string()
}
