// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Registry of the clusters known to the fleet control plane.

pub mod secret;
pub mod watch;

use crate::constants::in_cluster;
use crate::error::{ApidError, Result};
use crate::types::{ClusterIdentity, ConnectionState};
use arc_swap::ArcSwapOption;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

pub use secret::{cluster_secret_selector, secret_to_cluster};
pub use watch::watch_cluster_secrets;

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Namespace holding the cluster secrets
    pub namespace: String,
    /// Whether the in-cluster identity is part of the fleet
    pub include_in_cluster: bool,
    pub call_timeout: Duration,
}

/// Immutable snapshot of the resolved clusters, in resolution order
#[derive(Debug, Default)]
pub struct ClusterIndex {
    clusters: Vec<Arc<ClusterIdentity>>,
    by_name: HashMap<String, usize>,
    /// Registry generation the index was built in
    generation: u64,
}

impl ClusterIndex {
    /// Build an index, keeping the first identity for a repeated name
    pub fn new(identities: Vec<ClusterIdentity>) -> Self {
        let mut index = ClusterIndex::default();
        for identity in identities {
            if index.by_name.contains_key(&identity.name) {
                warn!("Duplicate cluster name '{}', keeping the first entry", identity.name);
                continue;
            }
            index.by_name.insert(identity.name.clone(), index.clusters.len());
            index.clusters.push(Arc::new(identity));
        }
        index
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClusterIdentity>> {
        self.by_name.get(name).map(|&i| self.clusters[i].clone())
    }

    pub fn clusters(&self) -> &[Arc<ClusterIdentity>] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

/// Discovers and caches cluster identities.
///
/// Refreshes build a new [`ClusterIndex`] and swap it in whole, so readers
/// always see either the previous or the next snapshot. Each index carries
/// the generation it was built in; one built before the latest
/// [`invalidate`](Self::invalidate) is never served from the cache.
pub struct ClusterRegistry {
    client: Client,
    options: RegistryOptions,
    index: ArcSwapOption<ClusterIndex>,
    in_cluster_probe: OnceCell<(Option<String>, ConnectionState)>,
    load_lock: Mutex<()>,
    scans: AtomicUsize,
    generation: AtomicU64,
}

impl ClusterRegistry {
    pub fn new(client: Client, options: RegistryOptions) -> Self {
        Self {
            client,
            options,
            index: ArcSwapOption::empty(),
            in_cluster_probe: OnceCell::new(),
            load_lock: Mutex::new(()),
            scans: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn namespace(&self) -> &str {
        &self.options.namespace
    }

    /// Number of times the backing secrets have been listed
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// All known clusters, scanning the secrets only when nothing is cached yet
    pub async fn resolve_all(&self) -> Result<Vec<Arc<ClusterIdentity>>> {
        Ok(self.snapshot().await?.clusters().to_vec())
    }

    /// The cached index, loading it once if needed
    pub async fn snapshot(&self) -> Result<Arc<ClusterIndex>> {
        if let Some(index) = self.cached() {
            return Ok(index);
        }

        let _guard = self.load_lock.lock().await;
        // Another caller may have loaded it while we waited
        if let Some(index) = self.cached() {
            return Ok(index);
        }
        self.rescan().await
    }

    /// Look up a cluster by name, rescanning exactly once on a cache miss
    #[instrument(skip(self))]
    pub async fn resolve(&self, name: &str) -> Result<Arc<ClusterIdentity>> {
        if let Some(index) = self.cached() {
            if let Some(cluster) = index.get(name) {
                return Ok(cluster);
            }
            debug!("Cluster '{}' not cached, rescanning", name);
        }

        let index = {
            let _guard = self.load_lock.lock().await;
            self.rescan().await?
        };

        index
            .get(name)
            .ok_or_else(|| ApidError::ClusterNotFound(name.to_string()))
    }

    /// Drop the cached index; the next call rescans.
    ///
    /// A rescan already in flight still answers its caller but its index is
    /// not served to anyone else.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.index.store(None);
    }

    /// The cached index, if it was built after the latest invalidation
    fn cached(&self) -> Option<Arc<ClusterIndex>> {
        let current = self.generation.load(Ordering::SeqCst);
        self.index
            .load_full()
            .filter(|index| index.generation == current)
    }

    /// List the cluster secrets and swap in a freshly built index
    #[instrument(skip(self), fields(namespace = %self.options.namespace))]
    async fn rescan(&self) -> Result<Arc<ClusterIndex>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let generation = self.generation.load(Ordering::SeqCst);

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.options.namespace);
        let lp = ListParams::default().labels(&cluster_secret_selector());

        let secret_list = match timeout(self.options.call_timeout, secrets.list(&lp)).await {
            Err(_) => {
                return Err(ApidError::RegistryUnavailable(
                    "request timed out".to_string(),
                ))
            }
            Ok(result) => result.map_err(|e| ApidError::RegistryUnavailable(e.to_string()))?,
        };

        debug!("Found {} cluster secrets", secret_list.items.len());

        let mut identities = Vec::with_capacity(secret_list.items.len() + 1);
        for secret in &secret_list.items {
            match secret_to_cluster(secret) {
                Ok(identity) => identities.push(identity),
                Err(e) => warn!(
                    "Unable to convert cluster secret '{}' to a cluster: {}",
                    secret.name_any(),
                    e
                ),
            }
        }

        let has_in_cluster_record = identities
            .iter()
            .any(|c| c.server() == in_cluster::SERVER);
        if self.options.include_in_cluster && !has_in_cluster_record {
            identities.push(self.in_cluster_identity().await);
        }

        let index = Arc::new(ClusterIndex::new(identities).with_generation(generation));
        if index.is_empty() {
            warn!("No clusters found in namespace {}", self.options.namespace);
        } else {
            info!("Resolved {} clusters", index.len());
        }

        if self.generation.load(Ordering::SeqCst) == generation {
            self.index.store(Some(index.clone()));
        } else {
            debug!("Cluster secrets changed during the rescan, not caching the result");
        }

        Ok(index)
    }

    /// The synthetic in-cluster identity; its version is probed once per registry
    async fn in_cluster_identity(&self) -> ClusterIdentity {
        let (server_version, connection_state) = self
            .in_cluster_probe
            .get_or_init(|| async {
                match timeout(self.options.call_timeout, self.client.apiserver_version()).await {
                    Ok(Ok(info)) => (
                        Some(format!("{}.{}", info.major, info.minor)),
                        ConnectionState::successful(),
                    ),
                    Ok(Err(e)) => {
                        warn!("Failed to probe the in-cluster API server: {}", e);
                        (None, ConnectionState::failed(e.to_string()))
                    }
                    Err(_) => {
                        warn!("Timed out probing the in-cluster API server");
                        (None, ConnectionState::failed("request timed out"))
                    }
                }
            })
            .await
            .clone();

        ClusterIdentity {
            server_version,
            connection_state,
            ..ClusterIdentity::in_cluster()
        }
    }
}
