// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource kinds inspected on every cluster

use crate::error::{ApidError, Result};
use kube::discovery::ApiResource;
use std::fmt;
use std::str::FromStr;

/// A listable resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceTypeRef {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl ResourceTypeRef {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, namespaced: bool) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            namespaced,
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Dynamic API descriptor for `Api<DynamicObject>`
    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.api_version(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

impl fmt::Display for ResourceTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.plural, self.version, self.group)
    }
}

// (group, version, kind, plural, namespaced)
const BUILTIN_RESOURCES: &[(&str, &str, &str, &str, bool)] = &[
    ("apps", "v1", "DaemonSet", "daemonsets", true),
    ("apps", "v1", "Deployment", "deployments", true),
    ("apps", "v1", "ReplicaSet", "replicasets", true),
    ("apps", "v1", "StatefulSet", "statefulsets", true),
    ("batch", "v1", "CronJob", "cronjobs", true),
    ("batch", "v1", "Job", "jobs", true),
    ("autoscaling", "v1", "HorizontalPodAutoscaler", "horizontalpodautoscalers", true),
    ("networking.k8s.io", "v1", "NetworkPolicy", "networkpolicies", true),
    ("networking.k8s.io", "v1", "Ingress", "ingresses", true),
    ("networking.k8s.io", "v1", "IngressClass", "ingressclasses", false),
    ("policy", "v1beta1", "PodSecurityPolicy", "podsecuritypolicies", false),
    ("policy", "v1", "PodDisruptionBudget", "poddisruptionbudgets", true),
    ("storage.k8s.io", "v1", "CSIDriver", "csidrivers", false),
    ("storage.k8s.io", "v1", "CSINode", "csinodes", false),
    ("storage.k8s.io", "v1", "StorageClass", "storageclasses", false),
    ("storage.k8s.io", "v1", "VolumeAttachment", "volumeattachments", false),
    ("scheduling.k8s.io", "v1", "PriorityClass", "priorityclasses", false),
    ("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles", false),
    ("rbac.authorization.k8s.io", "v1", "ClusterRoleBinding", "clusterrolebindings", false),
    ("rbac.authorization.k8s.io", "v1", "Role", "roles", true),
    ("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings", true),
    ("coordination.k8s.io", "v1", "Lease", "leases", true),
    ("certificates.k8s.io", "v1", "CertificateSigningRequest", "certificatesigningrequests", false),
    ("apiregistration.k8s.io", "v1", "APIService", "apiservices", false),
    ("apiextensions.k8s.io", "v1", "CustomResourceDefinition", "customresourcedefinitions", false),
    ("admissionregistration.k8s.io", "v1", "MutatingWebhookConfiguration", "mutatingwebhookconfigurations", false),
    ("admissionregistration.k8s.io", "v1", "ValidatingWebhookConfiguration", "validatingwebhookconfigurations", false),
    ("node.k8s.io", "v1", "RuntimeClass", "runtimeclasses", false),
    ("discovery.k8s.io", "v1", "EndpointSlice", "endpointslices", true),
];

/// A user-supplied kind in `Kind.version.group` form, resolved per cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionKind {
    pub kind: String,
    pub version: String,
    pub group: String,
}

impl ExtensionKind {
    pub fn group_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

impl FromStr for ExtensionKind {
    type Err = ApidError;

    /// Parse `Kind.version.group.tld`, e.g. `ManagedCertificate.v1beta1.networking.gke.io`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(ApidError::InvalidAdditionalKind(format!(
                "full form Kind.version.group.com is expected, instead got: {}",
                s
            )));
        }

        if !parts[0].starts_with(|c: char| c.is_uppercase()) {
            return Err(ApidError::InvalidAdditionalKind(format!(
                "Kind is expected to be capitalized by convention, instead got: {}",
                parts[0]
            )));
        }

        Ok(ExtensionKind {
            kind: parts[0].to_string(),
            version: parts[1].to_string(),
            group: parts[2..].join("."),
        })
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.kind, self.version, self.group)
    }
}

/// The fixed built-in kinds plus the configured extension kinds.
///
/// Both lists are set at construction and never change afterwards.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    fixed: Vec<ResourceTypeRef>,
    extensions: Vec<ExtensionKind>,
}

impl ResourceCatalog {
    pub fn new(extensions: Vec<ExtensionKind>) -> Self {
        let fixed = BUILTIN_RESOURCES
            .iter()
            .map(|(group, version, kind, plural, namespaced)| {
                ResourceTypeRef::new(group, version, kind, plural, *namespaced)
            })
            .collect();

        Self { fixed, extensions }
    }

    /// Validate every extension string before any cluster is contacted
    pub fn from_additional_kinds<S: AsRef<str>>(kinds: &[S]) -> Result<Self> {
        let extensions = parse_additional_kinds(kinds)?;
        Ok(Self::new(extensions))
    }

    pub fn fixed(&self) -> &[ResourceTypeRef] {
        &self.fixed
    }

    pub fn extensions(&self) -> &[ExtensionKind] {
        &self.extensions
    }
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Parse and validate all extension kind strings, failing on the first bad one
pub fn parse_additional_kinds<S: AsRef<str>>(kinds: &[S]) -> Result<Vec<ExtensionKind>> {
    kinds.iter().map(|k| k.as_ref().parse()).collect()
}
