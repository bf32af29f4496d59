//! Value objects that identify entities in the cluster tree.
//!
//! UIDs are pure functions of the metadata: equal metadata always yields the
//! same UID.

use serde::{Deserialize, Serialize};

/// Config path used for the cluster the process itself runs in.
pub const IN_CLUSTER_CONFIG_PATH: &str = "";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POD_NAME: &str = "torpedo";
pub const DEFAULT_SCHEDULER: &str = "k8s";
pub const DEFAULT_HYPERCONVERGED: bool = true;

/// Stable identity of a registry entry.
pub trait Uid {
    fn uid(&self) -> String;
}

// ─── Cluster ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterMetaData {
    pub config_path: String,
}

impl ClusterMetaData {
    pub fn new(config_path: impl Into<String>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn in_cluster() -> Self {
        Self::new(IN_CLUSTER_CONFIG_PATH)
    }

    pub fn is_in_cluster(&self) -> bool {
        self.config_path == IN_CLUSTER_CONFIG_PATH
    }
}

impl Uid for ClusterMetaData {
    fn uid(&self) -> String {
        self.config_path.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub config_path: String,
    pub scheduler: String,
    pub hyperconverged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_provisioner: Option<String>,
}

impl ClusterSpec {
    pub fn new(config_path: impl Into<String>, hyperconverged: bool) -> Self {
        Self {
            config_path: config_path.into(),
            scheduler: DEFAULT_SCHEDULER.to_string(),
            hyperconverged,
            storage_provisioner: None,
        }
    }

    pub fn with_defaults(config_path: impl Into<String>) -> Self {
        Self::new(config_path, DEFAULT_HYPERCONVERGED)
    }
}

impl Uid for ClusterSpec {
    fn uid(&self) -> String {
        self.config_path.clone()
    }
}

// ─── Namespace ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceMetaData {
    pub namespace: String,
}

impl NamespaceMetaData {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for NamespaceMetaData {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Uid for NamespaceMetaData {
    fn uid(&self) -> String {
        self.namespace.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceSpec {
    pub namespace: String,
}

impl Uid for NamespaceSpec {
    fn uid(&self) -> String {
        self.namespace.clone()
    }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// An application is identified by its spec key plus an optional instance
/// identifier, e.g. key `postgres` with identifier `["a"]` is `postgres-a`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppMetaData {
    pub app_key: String,
    #[serde(default)]
    pub identifier: Vec<String>,
}

impl AppMetaData {
    pub fn new(app_key: impl Into<String>, identifier: Vec<String>) -> Self {
        Self {
            app_key: app_key.into(),
            identifier,
        }
    }

    pub fn has_identifier(&self) -> bool {
        !self.identifier.is_empty()
    }

    /// `-<first identifier>`, or empty when unidentified.
    pub fn suffix(&self) -> String {
        self.identifier
            .first()
            .map(|id| format!("-{id}"))
            .unwrap_or_default()
    }

    pub fn name(&self) -> String {
        format!("{}{}", self.app_key, self.suffix())
    }
}

impl Uid for AppMetaData {
    fn uid(&self) -> String {
        self.name()
    }
}

// ─── Pod by name ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodByNameMetaData {
    pub pod_name: String,
}

impl PodByNameMetaData {
    pub fn new(pod_name: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
        }
    }
}

impl Default for PodByNameMetaData {
    fn default() -> Self {
        Self::new(DEFAULT_POD_NAME)
    }
}

impl Uid for PodByNameMetaData {
    fn uid(&self) -> String {
        self.pod_name.clone()
    }
}

// ─── Test ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestMetaData {
    pub test_uid: String,
}

impl TestMetaData {
    pub fn new(test_uid: impl Into<String>) -> Self {
        Self {
            test_uid: test_uid.into(),
        }
    }
}

impl Uid for TestMetaData {
    fn uid(&self) -> String {
        self.test_uid.clone()
    }
}
