// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for client creation, the resource catalog, API
//! discovery and manifest collection.

pub mod catalog;
pub mod client;
pub mod collector;
pub mod discovery;

pub use catalog::{ExtensionKind, ResourceCatalog, ResourceTypeRef};
pub use client::{ClusterConnector, KubeConnector};
pub use collector::{ClusterCollector, Collector, VersionProvider};
pub use discovery::DiscoveryCache;
