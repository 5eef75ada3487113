// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::pipeline::cluster::ClusterPipeline;
use crate::registry::ClusterRegistry;
use crate::types::{ClusterIdentity, ClusterReport};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Runs the pipeline across the registered clusters
pub struct Fleet {
    registry: Arc<ClusterRegistry>,
    pipeline: Arc<ClusterPipeline>,
    max_concurrency: usize,
}

impl Fleet {
    pub fn new(registry: Arc<ClusterRegistry>, pipeline: Arc<ClusterPipeline>, max_concurrency: usize) -> Self {
        Self {
            registry,
            pipeline,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn registry(&self) -> &Arc<ClusterRegistry> {
        &self.registry
    }

    /// One report per known cluster, in resolution order.
    ///
    /// Only a registry failure is an error; cluster failures are error reports.
    #[instrument(skip(self))]
    pub async fn run_all(&self) -> Result<Vec<ClusterReport>> {
        let clusters = self.registry.resolve_all().await?;
        info!("Checking {} clusters", clusters.len());

        let reports = stream::iter(clusters)
            .map(|cluster| run_isolated(self.pipeline.clone(), cluster))
            .buffered(self.max_concurrency)
            .collect::<Vec<_>>()
            .await;

        let failed = reports.iter().filter(|r| r.is_error()).count();
        info!("Checked {} clusters, {} failed", reports.len(), failed);
        Ok(reports)
    }

    /// Report for one cluster; an unknown name is `ClusterNotFound`
    #[instrument(skip(self))]
    pub async fn run_one(&self, name: &str) -> Result<ClusterReport> {
        let cluster = self.registry.resolve(name).await?;
        Ok(run_isolated(self.pipeline.clone(), cluster).await)
    }
}

/// Run one cluster, turning a panic inside it into that cluster's error report
async fn run_isolated(pipeline: Arc<ClusterPipeline>, cluster: Arc<ClusterIdentity>) -> ClusterReport {
    let name = cluster.name.clone();
    match AssertUnwindSafe(pipeline.run(cluster)).catch_unwind().await {
        Ok(report) => report,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Cluster {} panicked: {}", name, message);
            ClusterReport::failed(&name, format!("cluster processing panicked: {}", message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
