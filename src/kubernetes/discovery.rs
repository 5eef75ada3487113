// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of extension kinds against a cluster's API discovery

use crate::error::{ApidError, Result};
use crate::kubernetes::catalog::{ExtensionKind, ResourceTypeRef};
use kube::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Served resources per (cluster, group/version), shared between runs
#[derive(Default)]
pub struct DiscoveryCache {
    entries: RwLock<HashMap<String, Arc<Vec<ResourceTypeRef>>>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every extension kind, dropping the ones the cluster doesn't serve
    pub async fn resolve_all(
        &self,
        client: &Client,
        cluster_key: &str,
        kinds: &[ExtensionKind],
        call_timeout: Duration,
    ) -> Vec<ResourceTypeRef> {
        let mut resolved = Vec::with_capacity(kinds.len());

        for kind in kinds {
            match self.resolve(client, cluster_key, kind, call_timeout).await {
                Ok(Some(resource)) => resolved.push(resource),
                Ok(None) => warn!("Failed to map {} Kind to resource: not served", kind),
                Err(e) => warn!("Failed to map {} Kind to resource: {}", kind, e),
            }
        }

        resolved
    }

    /// Map a kind to its canonical plural resource, using cached discovery when present
    #[instrument(skip(self, client, call_timeout), fields(kind = %kind))]
    pub async fn resolve(
        &self,
        client: &Client,
        cluster_key: &str,
        kind: &ExtensionKind,
        call_timeout: Duration,
    ) -> Result<Option<ResourceTypeRef>> {
        let group_version = kind.group_version();
        let key = format!("{}#{}", cluster_key, group_version);

        let cached = self.entries.read().await.get(&key).cloned();
        let resources = match cached {
            Some(resources) => {
                debug!("Discovery cache hit for {}", group_version);
                resources
            }
            None => {
                let Some(resources) = discover(client, kind, call_timeout).await? else {
                    return Ok(None);
                };
                let resources = Arc::new(resources);
                self.entries.write().await.insert(key, resources.clone());
                resources
            }
        };

        Ok(resources.iter().find(|r| r.kind == kind.kind).cloned())
    }

    /// Number of cached group/version entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// List the resources served under the kind's group/version; `None` if the
/// group/version isn't known to the cluster
async fn discover(
    client: &Client,
    kind: &ExtensionKind,
    call_timeout: Duration,
) -> Result<Option<Vec<ResourceTypeRef>>> {
    let group_version = kind.group_version();
    debug!("Discovering resources for {}", group_version);

    let list = match timeout(call_timeout, client.list_api_group_resources(&group_version)).await {
        Err(_) => return Err(ApidError::ClusterUnreachable),
        Ok(Err(kube::Error::Api(err))) if err.code == 404 => return Ok(None),
        Ok(Err(e)) => return Err(e.into()),
        Ok(Ok(list)) => list,
    };

    Ok(Some(
        list.resources
            .into_iter()
            // Subresources such as `widgets/status` aren't listable kinds
            .filter(|r| !r.name.contains('/'))
            .map(|r| ResourceTypeRef {
                group: kind.group.clone(),
                version: kind.version.clone(),
                kind: r.kind,
                plural: r.name,
                namespaced: r.namespaced,
            })
            .collect(),
    ))
}
