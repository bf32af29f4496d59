//! Typed cluster requests and the per-cluster dispatch table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{debug_string, process_error, Error, Result};
use crate::scheduler::{AppSpec, ScheduleOptions, Scheduler, SchedulerContext, TearDownOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Schedule,
    Destroy,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestKind::Schedule => "Schedule",
            RequestKind::Destroy => "Destroy",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequest {
    pub apps: Vec<AppSpec>,
    pub instance_id: String,
    pub options: ScheduleOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct DestroyRequest {
    pub contexts: Vec<SchedulerContext>,
    pub options: TearDownOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum ClusterRequest {
    Schedule(ScheduleRequest),
    Destroy(DestroyRequest),
}

impl ClusterRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ClusterRequest::Schedule(_) => RequestKind::Schedule,
            ClusterRequest::Destroy(_) => RequestKind::Destroy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterResponse {
    Scheduled(Vec<SchedulerContext>),
    Destroyed,
}

impl ClusterResponse {
    pub fn into_contexts(self) -> Vec<SchedulerContext> {
        match self {
            ClusterResponse::Scheduled(contexts) => contexts,
            ClusterResponse::Destroyed => Vec::new(),
        }
    }
}

#[async_trait]
pub trait RequestProcessor: Send + Sync {
    async fn process(&self, request: ClusterRequest) -> anyhow::Result<ClusterResponse>;
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

/// Maps each [`RequestKind`] to the processor that handles it.
#[derive(Default)]
pub struct RequestManager {
    processors: RwLock<HashMap<RequestKind, Arc<dyn RequestProcessor>>>,
}

impl RequestManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager that routes every request kind to `scheduler`.
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        let manager = Self::new();
        let processor: Arc<dyn RequestProcessor> = Arc::new(SchedulerProcessor::new(scheduler));
        manager.register(RequestKind::Schedule, Arc::clone(&processor));
        manager.register(RequestKind::Destroy, processor);
        manager
    }

    /// Install `processor` for `kind`, replacing any previous one.
    pub fn register(&self, kind: RequestKind, processor: Arc<dyn RequestProcessor>) {
        self.processors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, processor);
    }

    pub fn is_registered(&self, kind: RequestKind) -> bool {
        self.processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    pub async fn process_request(&self, request: ClusterRequest) -> Result<ClusterResponse> {
        let kind = request.kind();
        let processor = self
            .processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .ok_or(Error::UnknownRequest(kind))?;

        let request_debug = debug_string(&request);
        debug!(%kind, "dispatching cluster request");
        match processor.process(request).await {
            Ok(response) => Ok(response),
            Err(e) => Err(process_error(e, Some(request_debug))),
        }
    }
}

impl fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self
            .processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(ToString::to_string)
            .collect();
        kinds.sort();
        f.debug_struct("RequestManager").field("kinds", &kinds).finish()
    }
}

/// Default processor: forwards requests to the scheduler collaborator.
pub struct SchedulerProcessor {
    scheduler: Arc<dyn Scheduler>,
}

impl SchedulerProcessor {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl RequestProcessor for SchedulerProcessor {
    async fn process(&self, request: ClusterRequest) -> anyhow::Result<ClusterResponse> {
        match request {
            ClusterRequest::Schedule(req) => {
                let contexts = self
                    .scheduler
                    .schedule(&req.apps, &req.instance_id, &req.options)
                    .await?;
                Ok(ClusterResponse::Scheduled(contexts))
            }
            ClusterRequest::Destroy(req) => {
                for ctx in &req.contexts {
                    self.scheduler.destroy(ctx, &req.options).await?;
                }
                Ok(ClusterResponse::Destroyed)
            }
        }
    }
}
