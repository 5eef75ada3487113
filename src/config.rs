// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use crate::kubernetes::catalog::{parse_additional_kinds, ExtensionKind};
use crate::types::Version;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// `production` switches logging to JSON at info
    pub app_mode: String,
    pub app_version: Option<String>,
    pub listen_port: u16,
    /// Namespace holding the cluster secrets
    pub argocd_namespace: String,
    pub target_version: Option<Version>,
    pub additional_kinds: Vec<ExtensionKind>,
    pub max_concurrent_clusters: usize,
    pub list_timeout: Duration,
    pub cluster_timeout: Duration,
    pub include_in_cluster: bool,
    pub watch_cluster_secrets: bool,
    pub rules_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let target_version = var("TARGET_VERSION")
            .map(|v| v.parse::<Version>())
            .transpose()
            .context("TARGET_VERSION is not a valid Kubernetes version")?;

        let additional_kinds = match var("ADDITIONAL_KINDS") {
            Some(raw) => {
                let kinds: Vec<&str> = raw.split(',').map(str::trim).filter(|k| !k.is_empty()).collect();
                parse_additional_kinds(&kinds).context("ADDITIONAL_KINDS contains an invalid kind")?
            }
            None => Vec::new(),
        };

        let max_concurrent_clusters: usize =
            parse_or("MAX_CONCURRENT_CLUSTERS", var("MAX_CONCURRENT_CLUSTERS"), defaults::MAX_CONCURRENT_CLUSTERS)?;
        if max_concurrent_clusters == 0 {
            bail!("MAX_CONCURRENT_CLUSTERS must be at least 1");
        }

        let list_timeout_secs: u64 =
            parse_or("LIST_TIMEOUT_SECS", var("LIST_TIMEOUT_SECS"), defaults::LIST_TIMEOUT_SECS)?;
        let cluster_timeout_secs: u64 =
            parse_or("CLUSTER_TIMEOUT_SECS", var("CLUSTER_TIMEOUT_SECS"), defaults::CLUSTER_TIMEOUT_SECS)?;
        if list_timeout_secs == 0 || cluster_timeout_secs == 0 {
            bail!("LIST_TIMEOUT_SECS and CLUSTER_TIMEOUT_SECS must be positive");
        }

        Ok(Config {
            app_mode: var("APP_MODE").unwrap_or_else(|| defaults::APP_MODE.to_string()),
            app_version: var("APP_VERSION"),
            listen_port: parse_or("LISTEN_PORT", var("LISTEN_PORT"), defaults::LISTEN_PORT)?,
            argocd_namespace: var("ARGOCD_NAMESPACE").unwrap_or_else(|| defaults::ARGOCD_NAMESPACE.to_string()),
            target_version,
            additional_kinds,
            max_concurrent_clusters,
            list_timeout: Duration::from_secs(list_timeout_secs),
            cluster_timeout: Duration::from_secs(cluster_timeout_secs),
            include_in_cluster: parse_or("INCLUDE_IN_CLUSTER", var("INCLUDE_IN_CLUSTER"), true)?,
            watch_cluster_secrets: parse_or("WATCH_CLUSTER_SECRETS", var("WATCH_CLUSTER_SECRETS"), true)?,
            rules_file: var("RULES_FILE").map(PathBuf::from),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_mode == defaults::APP_MODE
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
