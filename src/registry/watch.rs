// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Keeps the registry cache in step with the cluster secrets.

use crate::registry::{cluster_secret_selector, ClusterRegistry};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::WatchStreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::watcher::{self, Event};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Watch labeled cluster secrets and invalidate the registry on every change
pub async fn watch_cluster_secrets(registry: Arc<ClusterRegistry>) -> anyhow::Result<()> {
    let secrets: Api<Secret> = Api::namespaced(registry.client().clone(), registry.namespace());
    let config = watcher::Config::default().labels(&cluster_secret_selector());

    info!(
        "Watching cluster secrets in namespace {}",
        registry.namespace()
    );

    watcher::watcher(secrets, config)
        .default_backoff()
        .for_each(|event| {
            let registry = registry.clone();
            async move {
                match event {
                    Ok(Event::Apply(secret)) | Ok(Event::Delete(secret)) => {
                        info!("Cluster secret {} changed, invalidating registry", secret.name_any());
                        registry.invalidate();
                    }
                    Ok(Event::InitDone) => {
                        debug!("Cluster secret watch (re)synced, invalidating registry");
                        registry.invalidate();
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Cluster secret watch error: {}", e),
                }
            }
        })
        .await;

    warn!("Cluster secret watch ended");
    Ok(())
}
