// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use crate::policy::{Finding, RelevanceFilter};
use crate::types::Version;

/// Keeps findings already deprecated at the target version
#[derive(Debug, Clone, Copy, Default)]
pub struct SinceVersionFilter;

impl RelevanceFilter for SinceVersionFilter {
    fn filter(&self, findings: Vec<Finding>, target: &Version) -> Result<Vec<Finding>> {
        Ok(findings
            .into_iter()
            .filter(|f| f.since.as_ref().map_or(true, |since| since <= target))
            .collect())
    }
}
