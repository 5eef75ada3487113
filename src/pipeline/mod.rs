// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-cluster orchestration and the fleet-wide fan-out.

pub mod cluster;
pub mod fleet;
pub mod version;

pub use cluster::{ClusterPipeline, PipelineOptions};
pub use fleet::Fleet;
pub use version::resolve_target_version;
