// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use apid_scout::config::Config;
use apid_scout::constants::defaults;
use apid_scout::kubernetes::{KubeConnector, ResourceCatalog};
use apid_scout::pipeline::{ClusterPipeline, Fleet, PipelineOptions};
use apid_scout::policy::{PolicyEvaluator, RuleTableEvaluator, SinceVersionFilter};
use apid_scout::registry::{watch_cluster_secrets, ClusterRegistry, RegistryOptions};
use apid_scout::server::{self, AppState};

fn init_tracing(production: bool) {
    let default_level = if production { "info" } else { "debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if production {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.is_production());

    info!(
        "Starting apid-scout {}: namespace={}, target_version={:?}, additional_kinds={}",
        config.app_version.as_deref().unwrap_or("dev"),
        config.argocd_namespace,
        config.target_version.map(|v| v.to_string()),
        config.additional_kinds.len()
    );

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("unable to create the control-plane Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let registry = Arc::new(ClusterRegistry::new(
        client.clone(),
        RegistryOptions {
            namespace: config.argocd_namespace.clone(),
            include_in_cluster: config.include_in_cluster,
            call_timeout: config.list_timeout,
        },
    ));

    if config.watch_cluster_secrets {
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_cluster_secrets(registry).await {
                warn!("Cluster secret watcher stopped: {}", e);
            }
        });
    }

    let evaluator: Arc<dyn PolicyEvaluator> = Arc::new(match &config.rules_file {
        Some(path) => RuleTableEvaluator::from_file(path, &config.additional_kinds)?,
        None => RuleTableEvaluator::builtin(&config.additional_kinds)?,
    });

    let pipeline = ClusterPipeline::new(
        Arc::new(KubeConnector::new(client, config.list_timeout)),
        Arc::new(ResourceCatalog::new(config.additional_kinds.clone())),
        evaluator,
        Arc::new(SinceVersionFilter),
        PipelineOptions {
            target_version: config.target_version,
            list_timeout: config.list_timeout,
            cluster_timeout: config.cluster_timeout,
        },
    );
    let fleet = Fleet::new(registry, Arc::new(pipeline), config.max_concurrent_clusters);

    let state = Arc::new(AppState {
        fleet: Arc::new(fleet),
        app_version: config.app_version.clone(),
    });

    server::serve(
        state,
        config.listen_port,
        Duration::from_secs(defaults::SHUTDOWN_GRACE_SECS),
        shutdown_signal(),
    )
    .await
}
