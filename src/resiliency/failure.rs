//! Named failures a resiliency scenario can inject.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tracing::info;

use crate::error::{Error, Result};

pub const ACTIVE_NODE_REBOOT_DURING_DEPLOYMENT: &str = "active-node-reboot-during-deployment";
pub const KILL_DEPLOYMENT_CONTROLLER_POD_DURING_DEPLOYMENT: &str =
    "kill-deployment-controller-pod-during-deployment";
pub const RESTART_PX_DURING_DS_SCALEUP: &str = "restart-portworx-during-ds-scaleup";
pub const REBOOT_MULTIPLE_NODES_DURING_DEPLOYMENT: &str = "reboot-multiple-nodes-during-deployment";
pub const KILL_AGENT_POD_DURING_DEPLOYMENT: &str = "kill-agent-pod-during-deployment";
pub const RESTART_APP_DURING_RESOURCE_UPDATE: &str = "restart-app-during-resource-update";
pub const REBOOT_NODE_DURING_APP_VERSION_UPDATE: &str = "reboot-node-during-app-version-update";
pub const KILL_TELEPORT_POD_DURING_DEPLOYMENT: &str = "kill-teleport-pod-during-deployment";
pub const KILL_AGENT_POD_DURING_APP_SCALE_UP: &str = "kill-pds-agent-pod-during-app-scale-up";
pub const RESTORE_DS_DURING_PX_POOL_EXPANSION: &str = "restore-ds-during-px-pool-expansion";
pub const RESTORE_DS_DURING_KVDB_FAILOVER: &str = "restore-ds-during-kvdb-fail-over";
pub const RESTORE_DS_DURING_NODE_REBOOT: &str = "restore-ds-during-node-reboot";
pub const STOP_PX_DURING_STORAGE_RESIZE: &str = "stop-px-during-storage-resize";
pub const REBOOT_NODE_DURING_APP_RESOURCE_UPDATE: &str = "reboot-node-during-app-resource-update";
pub const KILL_DB_MASTER_NODE_DURING_STORAGE_RESIZE: &str =
    "kill-db-master-node-during-storage-resize";

/// Control-plane pods the pod-kill failures target, by name prefix.
pub const DEPLOYMENT_CONTROLLER_POD: &str = "pds-deployment-controller-manager";
pub const AGENT_POD: &str = "pds-agent";
pub const TELEPORT_POD: &str = "pds-teleport";
pub const BACKUP_CONTROLLER_POD: &str = "pds-backup-controller-manager";
pub const TARGET_CONTROLLER_POD: &str = "pds-operator-target-controller-manager";

type Action = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// A named, one-shot fault.
pub struct FailureType {
    name: String,
    action: Action,
}

impl FailureType {
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(move || action().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the fault. Consumes it; a failure is injected at most once.
    pub async fn induce(self) -> Result<()> {
        info!(failure = %self.name, "inducing failure");
        (self.action)().await
    }

    /// Restart the storage driver on `node`.
    pub fn restart_driver(
        name: impl Into<String>,
        driver: Arc<dyn NodeDriver>,
        node: String,
    ) -> Self {
        Self::new(name, move || async move {
            driver.restart_driver(&node).await.map_err(Error::from)
        })
    }

    /// Stop the storage driver on `node`.
    pub fn stop_driver(
        name: impl Into<String>,
        driver: Arc<dyn NodeDriver>,
        node: String,
    ) -> Self {
        Self::new(name, move || async move {
            driver.stop_driver(&node).await.map_err(Error::from)
        })
    }

    /// Reboot every node in `nodes`, in order, stopping at the first error.
    pub fn reboot_nodes(
        name: impl Into<String>,
        driver: Arc<dyn NodeDriver>,
        nodes: Vec<String>,
    ) -> Self {
        Self::new(name, move || async move {
            for node in &nodes {
                driver.reboot(node).await?;
            }
            Ok::<_, Error>(())
        })
    }
}

impl fmt::Debug for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureType").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Node-level operations the failures need from the storage/node drivers.
#[async_trait]
pub trait NodeDriver: Send + Sync {
    async fn restart_driver(&self, node: &str) -> anyhow::Result<()>;
    async fn stop_driver(&self, node: &str) -> anyhow::Result<()>;
    async fn reboot(&self, node: &str) -> anyhow::Result<()>;
}
