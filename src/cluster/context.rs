//! Kubeconfig context switching.
//!
//! Exactly one kubeconfig is "active" per [`CurrentContext`]. A cluster
//! operation takes the context lease, switches if needed, and keeps the lease
//! until it is done so two clusters never interleave on one active context.

use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::metadata::IN_CLUSTER_CONFIG_PATH;

/// The kubeconfig path currently in effect, shared by every cluster.
#[derive(Debug, Clone, Default)]
pub struct CurrentContext(Arc<Mutex<String>>);

impl CurrentContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self(Arc::new(Mutex::new(path.into())))
    }

    pub async fn path(&self) -> String {
        self.0.lock().await.clone()
    }
}

/// Makes a kubeconfig the one subsequent cluster calls go to.
#[async_trait]
pub trait ContextSwitcher: Send + Sync {
    async fn switch_to(&self, config_path: &str) -> anyhow::Result<()>;
}

/// Accepts a kubeconfig once it parses and names a current context.
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeconfigSwitcher;

#[async_trait]
impl ContextSwitcher for KubeconfigSwitcher {
    async fn switch_to(&self, config_path: &str) -> anyhow::Result<()> {
        if config_path == IN_CLUSTER_CONFIG_PATH {
            debug!("using in-cluster config");
            return Ok(());
        }
        let cfg = kube::config::Kubeconfig::read_from(config_path)
            .with_context(|| format!("Failed to read kubeconfig '{config_path}'"))?;
        let ctx = cfg
            .current_context
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow!("kubeconfig '{config_path}' has no current-context"))?;
        debug!(context = %ctx, path = config_path, "kubeconfig accepted");
        Ok(())
    }
}

// ─── Per-cluster context ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ContextPaths {
    dst: String,
    src: Option<String>,
}

/// Source/destination bookkeeping for one cluster.
#[derive(Debug, Default)]
pub struct ContextManager {
    paths: RwLock<ContextPaths>,
}

impl ContextManager {
    pub fn new(dst_config_path: impl Into<String>) -> Self {
        Self {
            paths: RwLock::new(ContextPaths {
                dst: dst_config_path.into(),
                src: None,
            }),
        }
    }

    pub fn dst_config_path(&self) -> String {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dst
            .clone()
    }

    /// Path that was active before the last switch, if any switch happened.
    pub fn src_config_path(&self) -> Option<String> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .src
            .clone()
    }

    /// Make this cluster's kubeconfig the active one.
    ///
    /// The returned guard holds the context lease; drop it when the cluster
    /// operation is finished.
    pub async fn switch_context<'a>(
        &self,
        current: &'a CurrentContext,
        switcher: &dyn ContextSwitcher,
    ) -> Result<ActiveContext<'a>> {
        let mut active = current.0.lock().await;
        let dst = self.dst_config_path();
        if *active != dst {
            switcher
                .switch_to(&dst)
                .await
                .map_err(|e| Error::context_switch(dst.clone(), e))?;
            info!(from = %active, to = %dst, "switched cluster context");
        }
        let previous = std::mem::replace(&mut *active, dst);
        self.paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .src = Some(previous);
        Ok(ActiveContext { guard: active })
    }
}

/// Lease on the active context. Derefs to the active kubeconfig path.
#[derive(Debug)]
pub struct ActiveContext<'a> {
    guard: MutexGuard<'a, String>,
}

impl Deref for ActiveContext<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.guard
    }
}
