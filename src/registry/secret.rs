// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decoding of cluster credential secrets

use crate::constants::{labels, secret_keys};
use crate::error::{ApidError, Result};
use crate::types::{ClusterConfig, ClusterIdentity, ConnectionDescriptor, ConnectionState};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use tracing::warn;

/// Label selector matching cluster credential secrets
pub fn cluster_secret_selector() -> String {
    format!("{}={}", labels::SECRET_TYPE, labels::SECRET_TYPE_CLUSTER)
}

/// Read a data key as UTF-8 text
fn data_field(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .and_then(|v| String::from_utf8(v.0.clone()).ok())
}

fn invalid(secret: &Secret, reason: impl Into<String>) -> ApidError {
    ApidError::InvalidClusterSecret {
        secret: secret.name_any(),
        reason: reason.into(),
    }
}

/// Split a comma-separated namespace list, dropping blanks and repeats
pub fn parse_namespaces(raw: &str) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::new();
    for ns in raw.split(',').map(str::trim).filter(|ns| !ns.is_empty()) {
        if !namespaces.iter().any(|existing| existing == ns) {
            namespaces.push(ns.to_string());
        }
    }
    namespaces
}

/// Convert a cluster secret into a cluster identity.
///
/// `name` and `server` are required and a malformed `config` payload rejects
/// the whole secret. A malformed `shard` is logged and left unset.
pub fn secret_to_cluster(secret: &Secret) -> Result<ClusterIdentity> {
    let name = data_field(secret, secret_keys::NAME)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(secret, "missing 'name'"))?;

    let server = data_field(secret, secret_keys::SERVER)
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid(secret, "missing 'server'"))?;

    let config = match data_field(secret, secret_keys::CONFIG) {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<ClusterConfig>(&raw)
            .map_err(|e| invalid(secret, format!("malformed 'config': {}", e)))?,
        _ => ClusterConfig::default(),
    };

    let namespaces = data_field(secret, secret_keys::NAMESPACES)
        .map(|raw| parse_namespaces(&raw))
        .unwrap_or_default();

    let cluster_resources = data_field(secret, secret_keys::CLUSTER_RESOURCES)
        .is_some_and(|v| v.trim() == "true");

    let shard = data_field(secret, secret_keys::SHARD).and_then(|raw| match raw.trim().parse::<i64>() {
        Ok(shard) => Some(shard),
        Err(e) => {
            warn!(
                "Error while parsing shard in cluster secret '{}': {}",
                secret.name_any(),
                e
            );
            None
        }
    });

    Ok(ClusterIdentity {
        name,
        id: secret.uid().unwrap_or_default(),
        connection: ConnectionDescriptor::new(server, config),
        namespaces,
        cluster_resources,
        shard,
        server_version: None,
        connection_state: ConnectionState::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_cluster_secret;

    #[test]
    fn test_decode_minimal_secret() {
        let secret = make_cluster_secret("prod-secret", &[("name", "prod"), ("server", "https://1.2.3.4/")]);

        let cluster = secret_to_cluster(&secret).unwrap();

        assert_eq!(cluster.name, "prod");
        assert_eq!(cluster.server(), "https://1.2.3.4");
        assert_eq!(cluster.id, "uid-prod-secret");
        assert!(cluster.namespaces.is_empty());
        assert!(cluster.shard.is_none());
        assert!(cluster.connection.config.is_empty());
    }

    #[test]
    fn test_decode_requires_name_and_server() {
        let no_server = make_cluster_secret("a", &[("name", "prod")]);
        assert!(matches!(
            secret_to_cluster(&no_server),
            Err(ApidError::InvalidClusterSecret { .. })
        ));

        let blank_name = make_cluster_secret("b", &[("name", "  "), ("server", "https://1.2.3.4")]);
        assert!(secret_to_cluster(&blank_name).is_err());
    }

    #[test]
    fn test_decode_namespaces_trimmed_and_deduplicated() {
        let secret = make_cluster_secret(
            "s",
            &[
                ("name", "prod"),
                ("server", "https://1.2.3.4"),
                ("namespaces", " team-a, ,team-b,team-a,"),
            ],
        );

        let cluster = secret_to_cluster(&secret).unwrap();

        assert_eq!(cluster.namespaces, vec!["team-a", "team-b"]);
    }

    #[test]
    fn test_decode_bad_shard_is_not_fatal() {
        let secret = make_cluster_secret(
            "s",
            &[("name", "prod"), ("server", "https://1.2.3.4"), ("shard", "two")],
        );

        let cluster = secret_to_cluster(&secret).unwrap();
        assert!(cluster.shard.is_none());

        let secret = make_cluster_secret(
            "s",
            &[("name", "prod"), ("server", "https://1.2.3.4"), ("shard", "2")],
        );
        assert_eq!(secret_to_cluster(&secret).unwrap().shard, Some(2));
    }

    #[test]
    fn test_decode_config_payload() {
        let secret = make_cluster_secret(
            "s",
            &[
                ("name", "prod"),
                ("server", "https://1.2.3.4"),
                ("config", r#"{"bearerToken":"abc","tlsClientConfig":{"insecure":true}}"#),
                ("clusterResources", "true"),
            ],
        );

        let cluster = secret_to_cluster(&secret).unwrap();

        assert_eq!(cluster.connection.config.bearer_token.as_deref(), Some("abc"));
        assert!(cluster.connection.config.tls_client_config.insecure);
        assert!(cluster.cluster_resources);
    }

    #[test]
    fn test_decode_malformed_config_fails_record() {
        let secret = make_cluster_secret(
            "s",
            &[("name", "prod"), ("server", "https://1.2.3.4"), ("config", "{bearerToken")],
        );

        let err = secret_to_cluster(&secret).unwrap_err();
        assert!(err.to_string().contains("malformed 'config'"));
    }

    #[test]
    fn test_selector() {
        assert_eq!(cluster_secret_selector(), "argocd.argoproj.io/secret-type=cluster");
    }
}
