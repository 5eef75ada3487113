// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Domain types shared across the registry, collectors and pipeline.

pub mod cluster;
pub mod report;
pub mod version;

pub use cluster::{ClusterConfig, ClusterIdentity, ConnectionDescriptor, ConnectionState};
pub use report::{ClusterReport, ClusterResult};
pub use version::Version;

/// One desired-state manifest decoded from a live object's applied configuration
pub type RawManifest = serde_json::Map<String, serde_json::Value>;
