// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rule-table policy evaluator.

use crate::error::{ApidError, Result};
use crate::kubernetes::ExtensionKind;
use crate::policy::{Finding, PolicyEvaluator};
use crate::types::{RawManifest, Version};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const BUILTIN_RULES: &str = include_str!("../../rules/removed-apis.yaml");

const ADDITIONAL_RULE_SET: &str = "Additional resources";
const UNDEFINED: &str = "<undefined>";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RuleSet {
    rule_set: String,
    apis: Vec<ApiRule>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiRule {
    api_version: String,
    kind: String,
    #[serde(default)]
    replace_with: String,
    #[serde(default)]
    since: Option<Version>,
}

#[derive(Debug, Clone)]
struct Rule {
    rule_set: String,
    replace_with: String,
    since: Option<Version>,
}

/// Flags manifests whose `(apiVersion, kind)` appears in a rule table
#[derive(Debug, Clone, Default)]
pub struct RuleTableEvaluator {
    rules: HashMap<(String, String), Rule>,
}

impl RuleTableEvaluator {
    /// Embedded rule table plus the configured additional kinds
    pub fn builtin(additional_kinds: &[ExtensionKind]) -> Result<Self> {
        Self::from_yaml(BUILTIN_RULES, additional_kinds)
    }

    pub fn from_file(path: &Path, additional_kinds: &[ExtensionKind]) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ApidError::Policy(format!("unable to read rules file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw, additional_kinds)
    }

    pub fn from_yaml(raw: &str, additional_kinds: &[ExtensionKind]) -> Result<Self> {
        let sets: Vec<RuleSet> = serde_yaml::from_str(raw)
            .map_err(|e| ApidError::Policy(format!("malformed rule table: {}", e)))?;

        let mut rules = HashMap::new();
        for set in sets {
            for api in set.apis {
                rules
                    .entry((api.api_version, api.kind))
                    .or_insert_with(|| Rule {
                        rule_set: set.rule_set.clone(),
                        replace_with: api.replace_with,
                        since: api.since,
                    });
            }
        }

        for kind in additional_kinds {
            rules
                .entry((kind.group_version(), kind.kind.clone()))
                .or_insert_with(|| Rule {
                    rule_set: ADDITIONAL_RULE_SET.to_string(),
                    replace_with: String::new(),
                    since: None,
                });
        }

        debug!("Loaded {} deprecation rules", rules.len());
        Ok(Self { rules })
    }
}

fn str_field<'a>(manifest: &'a RawManifest, key: &str) -> Option<&'a str> {
    manifest.get(key).and_then(|v| v.as_str())
}

fn metadata_field(manifest: &RawManifest, key: &str) -> String {
    manifest
        .get("metadata")
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .unwrap_or(UNDEFINED)
        .to_string()
}

impl PolicyEvaluator for RuleTableEvaluator {
    fn evaluate(&self, manifests: &[RawManifest]) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for manifest in manifests {
            let (Some(api_version), Some(kind)) =
                (str_field(manifest, "apiVersion"), str_field(manifest, "kind"))
            else {
                continue;
            };

            let Some(rule) = self
                .rules
                .get(&(api_version.to_string(), kind.to_string()))
            else {
                continue;
            };

            findings.push(Finding {
                name: metadata_field(manifest, "name"),
                namespace: metadata_field(manifest, "namespace"),
                kind: kind.to_string(),
                api_version: api_version.to_string(),
                rule_set: rule.rule_set.clone(),
                replace_with: rule.replace_with.clone(),
                since: rule.since,
            });
        }
        Ok(findings)
    }
}
