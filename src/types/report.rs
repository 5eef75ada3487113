// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::policy::Finding;
use serde::Serialize;

/// Per-cluster outcome: findings, or the reason the cluster could not be checked
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ClusterResult {
    Findings(Vec<Finding>),
    Error(String),
}

/// One entry of the fleet report
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReport {
    pub cluster_name: String,
    pub result: ClusterResult,
}

impl ClusterReport {
    pub fn findings(cluster_name: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            result: ClusterResult::Findings(findings),
        }
    }

    pub fn failed(cluster_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            result: ClusterResult::Error(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.result, ClusterResult::Error(_))
    }
}
