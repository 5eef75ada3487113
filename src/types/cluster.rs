// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::in_cluster;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything needed to open an API session against one cluster.
///
/// Built from a credential record and never mutated afterwards; a changed
/// record produces a new descriptor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionDescriptor {
    pub server: String,
    pub config: ClusterConfig,
}

impl ConnectionDescriptor {
    pub fn new(server: impl Into<String>, config: ClusterConfig) -> Self {
        Self {
            server: server.into(),
            config,
        }
    }

    /// Check if this points at the API server the service itself runs against
    /// without carrying credentials of its own
    pub fn is_in_cluster(&self) -> bool {
        self.server == in_cluster::SERVER && self.config.is_empty()
    }
}

/// Authentication payload embedded in a cluster secret under `config`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub tls_client_config: TlsClientConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_provider_config: Option<ExecProviderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_auth_config: Option<AwsAuthConfig>,
}

impl ClusterConfig {
    pub fn is_empty(&self) -> bool {
        *self == ClusterConfig::default()
    }
}

/// TLS settings; certificate fields hold base64-encoded PEM
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsClientConfig {
    #[serde(default)]
    pub insecure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_data: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecProviderConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_hint: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsAuthConfig {
    pub cluster_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Result of the last connection attempt recorded on an identity
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConnectionState {
    pub fn successful() -> Self {
        Self {
            status: ConnectionStatus::Successful,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Failed,
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Successful,
    Failed,
}

/// A cluster known to the fleet and how to reach it
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterIdentity {
    pub name: String,
    pub id: String,
    pub connection: ConnectionDescriptor,
    /// Namespaces the cluster is restricted to; empty means all
    pub namespaces: Vec<String>,
    /// Whether cluster-scoped kinds are visible despite a namespace restriction
    pub cluster_resources: bool,
    pub shard: Option<i64>,
    pub server_version: Option<String>,
    pub connection_state: ConnectionState,
}

impl ClusterIdentity {
    pub fn server(&self) -> &str {
        &self.connection.server
    }

    /// Check if listing is limited to specific namespaces
    pub fn is_namespace_restricted(&self) -> bool {
        !self.namespaces.is_empty()
    }

    /// Key used to share discovery results between runs against the same cluster
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.id, self.connection.server)
    }

    /// The synthetic identity for the cluster the service runs in
    pub fn in_cluster() -> Self {
        Self {
            name: in_cluster::NAME.to_string(),
            id: String::new(),
            connection: ConnectionDescriptor::new(in_cluster::SERVER, ClusterConfig::default()),
            namespaces: Vec::new(),
            cluster_resources: true,
            shard: None,
            server_version: None,
            connection_state: ConnectionState::default(),
        }
    }
}
