// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{ApidError, Result};
use crate::kubernetes::{ClusterCollector, ClusterConnector, Collector, DiscoveryCache, ResourceCatalog};
use crate::pipeline::version::resolve_target_version;
use crate::policy::{Finding, PolicyEvaluator, RelevanceFilter};
use crate::types::{ClusterIdentity, ClusterReport, Version};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Version to judge against instead of the cluster's own
    pub target_version: Option<Version>,
    /// Deadline for each list, discovery and version call
    pub list_timeout: Duration,
    /// Deadline for a whole cluster run
    pub cluster_timeout: Duration,
}

/// Runs connect, collect, version resolution, evaluation and filtering for
/// one cluster at a time.
pub struct ClusterPipeline {
    connector: Arc<dyn ClusterConnector>,
    catalog: Arc<ResourceCatalog>,
    discovery: Arc<DiscoveryCache>,
    evaluator: Arc<dyn PolicyEvaluator>,
    filter: Arc<dyn RelevanceFilter>,
    options: PipelineOptions,
}

impl ClusterPipeline {
    pub fn new(
        connector: Arc<dyn ClusterConnector>,
        catalog: Arc<ResourceCatalog>,
        evaluator: Arc<dyn PolicyEvaluator>,
        filter: Arc<dyn RelevanceFilter>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            connector,
            catalog,
            discovery: Arc::new(DiscoveryCache::new()),
            evaluator,
            filter,
            options,
        }
    }

    /// Produce the report for one cluster; failures become error reports
    #[instrument(skip(self, cluster), fields(cluster = %cluster.name))]
    pub async fn run(&self, cluster: Arc<ClusterIdentity>) -> ClusterReport {
        let outcome = match timeout(self.options.cluster_timeout, self.execute(cluster.clone())).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApidError::PipelineTimeout(self.options.cluster_timeout.as_secs())),
        };

        match outcome {
            Ok(findings) => {
                info!("Cluster produced {} findings", findings.len());
                ClusterReport::findings(&cluster.name, findings)
            }
            Err(e) => {
                warn!("Cluster failed: {}", e);
                ClusterReport::failed(&cluster.name, e.to_string())
            }
        }
    }

    async fn execute(&self, cluster: Arc<ClusterIdentity>) -> Result<Vec<Finding>> {
        let client = self
            .connector
            .connect(&cluster)
            .await
            .map_err(|e| ApidError::ConnectFailed(e.to_string()))?;

        let collectors: Vec<Box<dyn Collector>> = vec![Box::new(ClusterCollector::new(
            client,
            cluster.clone(),
            self.catalog.clone(),
            self.discovery.clone(),
            self.options.list_timeout,
        ))];

        let mut manifests = Vec::new();
        for collector in &collectors {
            let collected = collector.collect().await?;
            debug!("Collector {} retrieved {} manifests", collector.name(), collected.len());
            manifests.extend(collected);
        }

        let target = resolve_target_version(self.options.target_version, &collectors).await?;
        debug!("Evaluating {} manifests against {}", manifests.len(), target);

        let findings = self.evaluator.evaluate(&manifests)?;
        self.filter.filter(findings, &target)
    }
}
