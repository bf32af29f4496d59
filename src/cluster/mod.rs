//! The cluster tree: Cluster → Namespace → App, and Cluster → Namespace → PodByName.
//!
//! Each level keeps its children in an [`EntityManager`]. Callers never walk
//! the tree by hand; they go through the builders in [`config`], starting from
//! [`ClusterController::cluster`].

pub mod config;
pub mod context;
pub mod request;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::Result;
use crate::metadata::{AppMetaData, ClusterSpec, NamespaceMetaData, PodByNameMetaData, Uid};
use crate::registry::EntityManager;
use crate::scheduler::{Scheduler, SchedulerContext};

pub use config::{AppConfig, ClusterConfig, NamespaceConfig, PodByNameConfig};
use context::{ContextManager, ContextSwitcher, CurrentContext};
use request::{ClusterRequest, ClusterResponse, RequestManager};

// ─── Entities ─────────────────────────────────────────────────────────────────

/// A scheduled application and the scheduler contexts it produced.
#[derive(Debug, Clone)]
pub struct App {
    pub metadata: AppMetaData,
    pub contexts: Vec<SchedulerContext>,
}

#[derive(Debug, Clone)]
pub struct PodByName {
    pub metadata: PodByNameMetaData,
}

#[derive(Debug)]
pub struct Namespace {
    pub metadata: NamespaceMetaData,
    apps: EntityManager<Arc<App>>,
    pods: EntityManager<Arc<PodByName>>,
}

impl Namespace {
    pub fn new(metadata: NamespaceMetaData) -> Self {
        Self {
            metadata,
            apps: EntityManager::new(),
            pods: EntityManager::new(),
        }
    }

    pub fn apps(&self) -> &EntityManager<Arc<App>> {
        &self.apps
    }

    pub fn pods(&self) -> &EntityManager<Arc<PodByName>> {
        &self.pods
    }
}

#[derive(Debug)]
pub struct Cluster {
    pub spec: ClusterSpec,
    context: ContextManager,
    requests: RequestManager,
    namespaces: EntityManager<Arc<Namespace>>,
}

impl Cluster {
    pub fn new(spec: ClusterSpec, requests: RequestManager) -> Self {
        Self {
            context: ContextManager::new(spec.uid()),
            spec,
            requests,
            namespaces: EntityManager::new(),
        }
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    pub fn requests(&self) -> &RequestManager {
        &self.requests
    }

    pub fn namespaces(&self) -> &EntityManager<Arc<Namespace>> {
        &self.namespaces
    }

    /// Switch to this cluster's kubeconfig and dispatch `request` while
    /// holding the context lease.
    pub async fn process_cluster_request(
        &self,
        current: &CurrentContext,
        switcher: &dyn ContextSwitcher,
        request: ClusterRequest,
    ) -> Result<ClusterResponse> {
        let _active = self.context.switch_context(current, switcher).await?;
        self.requests.process_request(request).await
    }
}

// ─── Controller ───────────────────────────────────────────────────────────────

/// Root of the tree. Owns the cluster registry and the collaborators every
/// cluster shares.
pub struct ClusterController {
    clusters: EntityManager<Arc<Cluster>>,
    current: CurrentContext,
    switcher: Arc<dyn ContextSwitcher>,
    scheduler: Arc<dyn Scheduler>,
    settings: Settings,
}

impl ClusterController {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        switcher: Arc<dyn ContextSwitcher>,
        settings: Settings,
    ) -> Self {
        Self {
            clusters: EntityManager::new(),
            current: CurrentContext::default(),
            switcher,
            scheduler,
            settings,
        }
    }

    /// Share an existing active-context handle instead of a private one.
    #[must_use]
    pub fn with_current_context(mut self, current: CurrentContext) -> Self {
        self.current = current;
        self
    }

    /// Start a builder chain for the cluster behind `config_path`.
    pub fn cluster(&self, config_path: impl Into<String>) -> ClusterConfig<'_> {
        ClusterConfig::new(self, config_path.into())
    }

    pub fn clusters(&self) -> &EntityManager<Arc<Cluster>> {
        &self.clusters
    }

    pub fn current_context(&self) -> &CurrentContext {
        &self.current
    }

    pub fn switcher(&self) -> &dyn ContextSwitcher {
        self.switcher.as_ref()
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
