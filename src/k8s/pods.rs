use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::StatefulSet, core::v1::Pod};
use kube::{
    api::{Api, DeleteParams, ListParams},
    Client, ResourceExt,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Error;
use crate::poll::poll_until;
use crate::resiliency::failure::NodeDriver;
use crate::resiliency::{FailureType, ReplicaProbe};

/// Ready replicas of one StatefulSet.
pub struct StatefulSetReplicas {
    api: Api<StatefulSet>,
    name: String,
}

impl StatefulSetReplicas {
    pub fn new(client: Client, namespace: &str, name: impl Into<String>) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: name.into(),
        }
    }
}

#[async_trait]
impl ReplicaProbe for StatefulSetReplicas {
    async fn ready_replicas(&self) -> Result<i32> {
        let sts = self
            .api
            .get(&self.name)
            .await
            .with_context(|| format!("Failed to get StatefulSet '{}'", self.name))?;
        Ok(sts.status.and_then(|s| s.ready_replicas).unwrap_or(0))
    }
}

/// Pods whose name starts with a prefix and whose status is `Running`.
pub struct RunningPods {
    api: Api<Pod>,
    prefix: String,
}

impl RunningPods {
    pub fn new(client: Client, namespace: &str, prefix: impl Into<String>) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl ReplicaProbe for RunningPods {
    async fn ready_replicas(&self) -> Result<i32> {
        let pods = list_pods(&self.api).await?;
        let running = pods
            .iter()
            .filter(|p| p.name_any().starts_with(&self.prefix))
            .filter(|p| pod_status(p) == "Running")
            .count();
        Ok(i32::try_from(running).unwrap_or(i32::MAX))
    }
}

async fn list_pods(api: &Api<Pod>) -> Result<Vec<Pod>> {
    let list = api
        .list(&ListParams::default())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list pods: {e}\nIs the cluster reachable?"))?;
    Ok(list.items)
}

/// Delete every pod in `namespace` whose name starts with `prefix`.
/// Returns how many were deleted; matching nothing is an error.
pub async fn delete_pods_with_prefix(client: Client, namespace: &str, prefix: &str) -> Result<usize> {
    let api: Api<Pod> = Api::namespaced(client, namespace);
    let targets: Vec<String> = list_pods(&api)
        .await?
        .iter()
        .map(ResourceExt::name_any)
        .filter(|name| name.starts_with(prefix))
        .collect();
    if targets.is_empty() {
        bail!("no pod matching '{prefix}*' in namespace '{namespace}'");
    }
    for name in &targets {
        api.delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("Failed to delete pod {namespace}/{name}"))?;
        info!(pod = %name, %namespace, "deleted pod");
    }
    Ok(targets.len())
}

/// A failure that kills the pods matching `prefix`, e.g.
/// [`AGENT_POD`](crate::resiliency::failure::AGENT_POD).
pub fn kill_pods_failure(
    name: impl Into<String>,
    client: Client,
    namespace: impl Into<String>,
    prefix: impl Into<String>,
) -> FailureType {
    let namespace = namespace.into();
    let prefix = prefix.into();
    FailureType::new(name, move || async move {
        delete_pods_with_prefix(client, &namespace, &prefix)
            .await
            .map(|_| ())
            .map_err(Error::from)
    })
}

// ─── Active node reboot ───────────────────────────────────────────────────────

/// Whether `pod` is one of StatefulSet `statefulset`'s ordinal pods.
pub fn is_statefulset_pod(pod: &Pod, statefulset: &str) -> bool {
    pod.name_any()
        .strip_prefix(statefulset)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|ordinal| {
            !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit())
        })
}

/// The node the pod is scheduled on; blank names count as unscheduled.
pub fn node_name(pod: &Pod) -> Option<&str> {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.node_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// The pod's `Ready` condition is `True`.
pub fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conds| conds.iter().any(|c| c.type_ == "Ready" && c.status == "True"))
}

/// At least one pod exists and every pod has a node assigned.
pub fn all_scheduled(pods: &[Pod]) -> bool {
    !pods.is_empty() && pods.iter().all(|p| node_name(p).is_some())
}

/// Nodes hosting pods that are not ready yet, in pod order without repeats.
pub fn nodes_to_reboot(pods: &[Pod]) -> Result<Vec<String>> {
    let mut nodes: Vec<String> = Vec::new();
    for pod in pods.iter().filter(|p| !is_pod_ready(p)) {
        let Some(node) = node_name(pod) else {
            bail!("pod '{}' has no node assigned", pod.name_any());
        };
        if !nodes.iter().any(|n| n == node) {
            nodes.push(node.to_string());
        }
    }
    Ok(nodes)
}

async fn statefulset_pods(api: &Api<Pod>, statefulset: &str) -> Result<Vec<Pod>> {
    Ok(list_pods(api)
        .await?
        .into_iter()
        .filter(|p| is_statefulset_pod(p, statefulset))
        .collect())
}

/// A failure that waits for StatefulSet `statefulset`'s pods to be placed on
/// nodes, then reboots every node still hosting a pod that is not ready.
/// Reboots stop at the first error.
#[allow(clippy::too_many_arguments)]
pub fn active_node_reboot_failure(
    name: impl Into<String>,
    client: Client,
    namespace: impl Into<String>,
    statefulset: impl Into<String>,
    driver: Arc<dyn NodeDriver>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> FailureType {
    let namespace = namespace.into();
    let statefulset = statefulset.into();
    FailureType::new(name, move || async move {
        let api: Api<Pod> = Api::namespaced(client, &namespace);
        poll_until(
            || {
                let api = api.clone();
                let statefulset = statefulset.clone();
                async move {
                    let pods = statefulset_pods(&api, &statefulset).await?;
                    debug!(%statefulset, pods = pods.len(), "waiting for node assignment");
                    Ok::<_, Error>(all_scheduled(&pods))
                }
            },
            interval,
            timeout,
            &cancel,
        )
        .await?;

        let pods = statefulset_pods(&api, &statefulset).await?;
        let nodes = nodes_to_reboot(&pods)?;
        if nodes.is_empty() {
            info!(%statefulset, "every pod is ready, no node to reboot");
        }
        for node in &nodes {
            driver.reboot(node).await?;
            info!(%node, %statefulset, "rebooted node hosting a pod that is not ready");
        }
        Ok::<_, Error>(())
    })
}

/// Human-readable pod status, as kubectl shows in the STATUS column.
pub fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let Some(status) = &pod.status else {
        return "Unknown".to_string();
    };

    // Waiting reasons (CrashLoopBackOff, ImagePullBackOff) and failed exits win over phase.
    for cs in status.container_statuses.iter().flatten() {
        let Some(state) = &cs.state else { continue };
        if let Some(reason) = state.waiting.as_ref().and_then(|w| w.reason.as_ref()) {
            if reason != "ContainerCreating" {
                return reason.clone();
            }
        }
        if let Some(terminated) = state.terminated.as_ref().filter(|t| t.exit_code != 0) {
            return terminated
                .reason
                .clone()
                .unwrap_or_else(|| "Error".to_string());
        }
    }

    for cs in status.init_container_statuses.iter().flatten() {
        if let Some(reason) = cs
            .state
            .as_ref()
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.as_ref())
        {
            return format!("Init:{reason}");
        }
    }

    status
        .phase
        .clone()
        .unwrap_or_else(|| "Unknown".to_string())
}
