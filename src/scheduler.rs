//! The scheduler collaborator: deploys, validates and destroys applications.
//!
//! Torpedo never talks to a scheduler directly; [`crate::cluster`] calls
//! whatever implementation the caller hands to the controller.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A deployable application spec as loaded by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    pub key: String,
    #[serde(default)]
    pub spec_list: Vec<serde_json::Value>,
}

impl AppSpec {
    /// Copy of the spec with `suffix` appended to every named object, so
    /// several instances of one app can live in the same namespace.
    #[must_use]
    pub fn with_name_suffix(&self, suffix: &str) -> Self {
        let mut spec = self.clone();
        for object in &mut spec.spec_list {
            if let Some(name) = object.name().map(str::to_string) {
                object.set_name(format!("{name}{suffix}"));
            }
        }
        spec
    }
}

/// A spec object whose name can be read and patched.
pub trait SpecObject {
    fn name(&self) -> Option<&str>;
    fn set_name(&mut self, name: String);
}

/// Kubernetes manifests: the name lives at `metadata.name`.
impl SpecObject for serde_json::Value {
    fn name(&self) -> Option<&str> {
        self.pointer("/metadata/name").and_then(serde_json::Value::as_str)
    }

    fn set_name(&mut self, name: String) {
        if let Some(slot) = self.pointer_mut("/metadata/name") {
            *slot = serde_json::Value::String(name);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    pub app_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_provisioner: Option<String>,
    pub namespace: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// One scheduled instance of an app. Returned by [`Scheduler::schedule`] and
/// handed back for validation and teardown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerContext {
    pub uid: String,
    pub app: AppSpec,
    pub schedule_options: ScheduleOptions,
    #[serde(default)]
    pub skip_cluster_scoped_objects: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateOptions {
    pub timeout: Duration,
    pub retry_interval: Duration,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10 * 60),
            retry_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TearDownOptions {
    pub wait_for_destroy: bool,
    pub wait_for_resource_leak_cleanup: bool,
    pub skip_cluster_scoped_objects: bool,
}

impl Default for TearDownOptions {
    fn default() -> Self {
        Self {
            wait_for_destroy: true,
            wait_for_resource_leak_cleanup: true,
            skip_cluster_scoped_objects: false,
        }
    }
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn app_spec(&self, key: &str) -> anyhow::Result<AppSpec>;

    async fn schedule(
        &self,
        apps: &[AppSpec],
        instance_id: &str,
        options: &ScheduleOptions,
    ) -> anyhow::Result<Vec<SchedulerContext>>;

    async fn validate_context(
        &self,
        ctx: &SchedulerContext,
        options: &ValidateOptions,
    ) -> anyhow::Result<()>;

    async fn delete_volumes(&self, ctx: &SchedulerContext) -> anyhow::Result<()>;

    async fn destroy(&self, ctx: &SchedulerContext, options: &TearDownOptions)
        -> anyhow::Result<()>;
}
