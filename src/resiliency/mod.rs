//! Resiliency scenarios: wait for a state transition, then inject a fault.
//!
//! A scenario runs two tasks side by side. The *watcher* observes the system
//! (e.g. "the StatefulSet reached 3 replicas") and reports through a
//! [`ConditionSignal`]. The *injector* blocks on that signal and either runs
//! the [`FailureType`] or records [`Error::ConditionNotMet`]. Every error either
//! side produces is collected and returned together.

pub mod failure;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::poll::poll_until;

pub use failure::{FailureType, NodeDriver};

/// Error channel slots: watcher report, watcher result, injector.
const ERROR_SLOTS: usize = 3;

/// Per-scenario coordination state.
#[derive(Debug, Clone, Copy)]
pub struct ResiliencyContext {
    deadline: Duration,
}

impl ResiliencyContext {
    /// `deadline` bounds the whole scenario, watcher and injector together.
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.resiliency_deadline())
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `watcher` and `failure` concurrently. The failure is injected only
    /// after the watcher reports the condition as met.
    pub async fn induce_failure_after_waiting_for_condition<W, Fut>(
        &self,
        watcher: W,
        failure: FailureType,
    ) -> Result<()>
    where
        W: FnOnce(ConditionSignal) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (cond_tx, cond_rx) = oneshot::channel();
        let (err_tx, mut err_rx) = mpsc::channel(ERROR_SLOTS);
        let name = failure.name().to_string();

        let signal = ConditionSignal {
            tx: Some(cond_tx),
            errors: err_tx.clone(),
        };
        let watch_errors = err_tx.clone();
        let watch = watcher(signal);
        let watch_task = async move {
            if let Err(e) = watch.await {
                report(&watch_errors, e);
            }
        };
        let inject_task = induce_failure(cond_rx, failure, err_tx);

        let tasks = execute_in_parallel(vec![watch_task.boxed(), inject_task.boxed()]);
        let mut errors = match tokio::time::timeout(self.deadline, tasks).await {
            Ok(task_errors) => task_errors,
            Err(_) => {
                warn!(failure = %name, deadline = ?self.deadline, "scenario deadline exceeded");
                vec![Error::Timeout(self.deadline)]
            }
        };

        err_rx.close();
        while let Ok(e) = err_rx.try_recv() {
            errors.push(e);
        }
        if errors.is_empty() {
            info!(failure = %name, "scenario passed");
        } else {
            warn!(failure = %name, count = errors.len(), "scenario collected errors");
        }
        Error::aggregate(errors)
    }
}

fn report(errors: &mpsc::Sender<Error>, e: Error) {
    if let Err(e) = errors.try_send(e) {
        warn!("dropping resiliency error: {e}");
    }
}

/// Watcher's handle on the condition. Dropping it without calling
/// [`met`](Self::met) counts as the condition failing.
#[derive(Debug)]
pub struct ConditionSignal {
    tx: Option<oneshot::Sender<bool>>,
    errors: mpsc::Sender<Error>,
}

impl ConditionSignal {
    pub fn met(mut self) {
        if let Some(tx) = self.tx.take() {
            debug!("resiliency condition met");
            let _ = tx.send(true);
        }
    }

    /// Report `err` and mark the condition as failed.
    pub fn failed(mut self, err: Error) {
        report(&self.errors, err);
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(false);
        }
    }

    /// Resolve the signal from the outcome of `check`.
    pub async fn watch<F>(self, check: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match check.await {
            Ok(()) => self.met(),
            Err(e) => self.failed(e),
        }
        Ok(())
    }
}

impl Drop for ConditionSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(false);
        }
    }
}

/// Wait for the watcher's verdict, then inject `failure` or record that the
/// condition was not met.
pub async fn induce_failure(
    condition: oneshot::Receiver<bool>,
    failure: FailureType,
    errors: mpsc::Sender<Error>,
) {
    if condition.await.unwrap_or(false) {
        if let Err(e) = failure.induce().await {
            report(&errors, e);
        }
    } else {
        report(&errors, Error::ConditionNotMet);
    }
}

/// Run every task concurrently and wait for all of them. Tasks that panic or
/// are cancelled come back as errors.
pub async fn execute_in_parallel(tasks: Vec<BoxFuture<'static, ()>>) -> Vec<Error> {
    let mut set = JoinSet::new();
    for task in tasks {
        set.spawn(task);
    }
    let mut errors = Vec::new();
    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            errors.push(Error::Other(anyhow!("resiliency task failed: {e}")));
        }
    }
    errors
}

// ─── Watchers ─────────────────────────────────────────────────────────────────

/// Source of a workload's ready replica count.
#[async_trait]
pub trait ReplicaProbe: Send + Sync {
    async fn ready_replicas(&self) -> anyhow::Result<i32>;
}

/// Poll `probe` until at least `target` replicas are ready.
pub async fn wait_for_replicas(
    probe: Arc<dyn ReplicaProbe>,
    target: i32,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()> {
    poll_until(
        || {
            let probe = Arc::clone(&probe);
            async move {
                let ready = probe.ready_replicas().await?;
                debug!(ready, target, "replica check");
                Ok::<_, Error>(ready >= target)
            }
        },
        interval,
        timeout,
        cancel,
    )
    .await
}
