// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApidError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to build client config: {0}")]
    KubeconfigError(String),

    #[error("Invalid cluster secret '{secret}': {reason}")]
    InvalidClusterSecret { secret: String, reason: String },

    #[error("Invalid additional kind: {0}")]
    InvalidAdditionalKind(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Cluster '{0}' not found")]
    ClusterNotFound(String),

    #[error("unable to connect: {0}")]
    ConnectFailed(String),

    #[error("couldn't connect to the cluster; timeout error")]
    ClusterUnreachable,

    #[error("failed to get server version: {0}")]
    ServerVersion(String),

    #[error("failed to detect k8s version: {0}")]
    VersionDetection(String),

    #[error("cluster processing timed out after {0}s")]
    PipelineTimeout(u64),

    #[error("Policy evaluation failed: {0}")]
    Policy(String),

    #[error("Unable to list cluster secrets: {0}")]
    RegistryUnavailable(String),
}

impl ApidError {
    /// Is this "the named cluster is unknown" rather than any other failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApidError::ClusterNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ApidError>;
