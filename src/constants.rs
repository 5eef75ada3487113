// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Labels used by the fleet control plane to tag credential records
pub mod labels {
    /// Label key marking a secret's type
    pub const SECRET_TYPE: &str = "argocd.argoproj.io/secret-type";
    /// Label value identifying a cluster credential secret
    pub const SECRET_TYPE_CLUSTER: &str = "cluster";
}

/// Annotation keys read from live objects
pub mod annotations {
    /// Historical configuration written by client-side apply
    pub const LAST_APPLIED_CONFIGURATION: &str = "kubectl.kubernetes.io/last-applied-configuration";
}

/// Data keys of a cluster credential secret
pub mod secret_keys {
    pub const NAME: &str = "name";
    pub const SERVER: &str = "server";
    pub const NAMESPACES: &str = "namespaces";
    pub const CLUSTER_RESOURCES: &str = "clusterResources";
    pub const SHARD: &str = "shard";
    pub const CONFIG: &str = "config";
}

/// Synthetic in-cluster identity
pub mod in_cluster {
    /// Well-known address of the API server the service itself runs against
    pub const SERVER: &str = "https://kubernetes.default.svc";
    /// Name the in-cluster identity is registered under
    pub const NAME: &str = "in-cluster";
}

/// Configuration defaults
pub mod defaults {
    pub const APP_MODE: &str = "production";
    pub const LISTEN_PORT: u16 = 8080;
    pub const ARGOCD_NAMESPACE: &str = "argocd";
    pub const MAX_CONCURRENT_CLUSTERS: usize = 4;
    pub const LIST_TIMEOUT_SECS: u64 = 30;
    pub const CLUSTER_TIMEOUT_SECS: u64 = 300;
    pub const SHUTDOWN_GRACE_SECS: u64 = 20;
}

/// Name reported by the resource collector
pub const CLUSTER_COLLECTOR_NAME: &str = "Cluster";
