// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{ApidError, Result};
use crate::kubernetes::Collector;
use crate::types::Version;
use tracing::debug;

/// Pick the version to judge manifests against.
///
/// A configured override wins and never touches the cluster. Otherwise the
/// first collector with a version capability is asked.
pub async fn resolve_target_version(
    target: Option<Version>,
    collectors: &[Box<dyn Collector>],
) -> Result<Version> {
    if let Some(version) = target {
        debug!("Using configured target version {}", version);
        return Ok(version);
    }

    let provider = collectors
        .iter()
        .find_map(|c| c.version_provider())
        .ok_or_else(|| ApidError::VersionDetection("no version-capable collector".to_string()))?;

    let version = provider
        .server_version()
        .await
        .map_err(|e| ApidError::VersionDetection(e.to_string()))?;

    debug!("Detected target version {}", version);
    Ok(version)
}
