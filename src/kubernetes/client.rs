// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Downstream cluster client creation

use crate::error::{ApidError, Result};
use crate::types::{ClusterConfig, ClusterIdentity, ConnectionDescriptor};
use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const CONTEXT_NAME: &str = "cluster";

/// Opens an API session against a cluster identity
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self, cluster: &ClusterIdentity) -> Result<Client>;
}

/// Connects using the credentials carried in each identity's descriptor
pub struct KubeConnector {
    manager_client: Client,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl KubeConnector {
    /// `manager_client` is reused for the in-cluster identity
    pub fn new(manager_client: Client, call_timeout: Duration) -> Self {
        Self {
            manager_client,
            connect_timeout: call_timeout.min(Duration::from_secs(10)),
            read_timeout: call_timeout,
        }
    }
}

#[async_trait]
impl ClusterConnector for KubeConnector {
    #[instrument(skip(self, cluster), fields(cluster = %cluster.name))]
    async fn connect(&self, cluster: &ClusterIdentity) -> Result<Client> {
        if cluster.connection.is_in_cluster() {
            debug!("Using the service's own client for the in-cluster identity");
            return Ok(self.manager_client.clone());
        }

        let kubeconfig = descriptor_to_kubeconfig(&cluster.connection)?;
        let mut client_config =
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    ApidError::KubeconfigError(format!("Failed to create config: {}", e))
                })?;
        client_config.connect_timeout = Some(self.connect_timeout);
        client_config.read_timeout = Some(self.read_timeout);

        Client::try_from(client_config)
            .map_err(|e| ApidError::KubeconfigError(format!("Failed to create client: {}", e)))
    }
}

/// Render a connection descriptor as a single-context kubeconfig
pub fn descriptor_to_kubeconfig(descriptor: &ConnectionDescriptor) -> Result<Kubeconfig> {
    url::Url::parse(&descriptor.server).map_err(|e| {
        ApidError::KubeconfigError(format!("Invalid server URL '{}': {}", descriptor.server, e))
    })?;

    let config = &descriptor.config;
    let tls = &config.tls_client_config;

    let mut cluster = json!({ "server": descriptor.server });
    if tls.insecure {
        cluster["insecure-skip-tls-verify"] = json!(true);
    }
    if let Some(server_name) = &tls.server_name {
        cluster["tls-server-name"] = json!(server_name);
    }
    if let Some(ca) = &tls.ca_data {
        cluster["certificate-authority-data"] = json!(ca);
    }

    let kubeconfig = json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{ "name": CONTEXT_NAME, "cluster": cluster }],
        "users": [{ "name": CONTEXT_NAME, "user": auth_info(config) }],
        "contexts": [{
            "name": CONTEXT_NAME,
            "context": { "cluster": CONTEXT_NAME, "user": CONTEXT_NAME }
        }],
        "current-context": CONTEXT_NAME,
    });

    serde_json::from_value(kubeconfig)
        .map_err(|e| ApidError::KubeconfigError(format!("Failed to build kubeconfig: {}", e)))
}

fn auth_info(config: &ClusterConfig) -> Value {
    let tls = &config.tls_client_config;
    let mut user = json!({});

    if let Some(token) = &config.bearer_token {
        user["token"] = json!(token);
    }
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        user["username"] = json!(username);
        user["password"] = json!(password);
    }
    if let Some(cert) = &tls.cert_data {
        user["client-certificate-data"] = json!(cert);
    }
    if let Some(key) = &tls.key_data {
        user["client-key-data"] = json!(key);
    }

    if let Some(exec) = &config.exec_provider_config {
        let env: Vec<Value> = exec
            .env
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();
        user["exec"] = json!({
            "apiVersion": exec
                .api_version
                .clone()
                .unwrap_or_else(|| "client.authentication.k8s.io/v1beta1".to_string()),
            "command": exec.command,
            "args": exec.args,
            "env": env,
        });
    } else if let Some(aws) = &config.aws_auth_config {
        let mut args = vec![
            "aws".to_string(),
            "--cluster-name".to_string(),
            aws.cluster_name.clone(),
        ];
        if let Some(role_arn) = &aws.role_arn {
            args.extend(["--role-arn".to_string(), role_arn.clone()]);
        }
        let env: Vec<Value> = aws
            .profile
            .iter()
            .map(|profile| json!({ "name": "AWS_PROFILE", "value": profile }))
            .collect();
        user["exec"] = json!({
            "apiVersion": "client.authentication.k8s.io/v1beta1",
            "command": "argocd-k8s-auth",
            "args": args,
            "env": env,
        });
    }

    user
}
