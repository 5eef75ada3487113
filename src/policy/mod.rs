// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deprecation policy collaborators.
//!
//! The pipeline only moves [`Finding`]s from the evaluator through the
//! relevance filter into the report; it never looks inside them.

pub mod filter;
pub mod rules;

use crate::error::Result;
use crate::types::{RawManifest, Version};
use serde::{Deserialize, Serialize};

pub use filter::SinceVersionFilter;
pub use rules::RuleTableEvaluator;

/// A manifest using an API version that is deprecated or removed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub api_version: String,
    pub rule_set: String,
    pub replace_with: String,
    pub since: Option<Version>,
}

/// Judges manifests against deprecation rules
pub trait PolicyEvaluator: Send + Sync {
    fn evaluate(&self, manifests: &[RawManifest]) -> Result<Vec<Finding>>;
}

/// Drops findings that don't apply to the target version
pub trait RelevanceFilter: Send + Sync {
    fn filter(&self, findings: Vec<Finding>, target: &Version) -> Result<Vec<Finding>>;
}
