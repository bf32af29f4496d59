//! Fluent builders over the cluster tree.
//!
//! ```ignore
//! let uid = controller.cluster(path).register(true);
//! let app = controller.cluster(path).namespace("pg").app("postgres", vec![]);
//! app.schedule().await?;
//! app.validate().await?;
//! app.tear_down().await?;
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use super::request::{ClusterRequest, DestroyRequest, RequestManager, ScheduleRequest};
use super::{App, Cluster, ClusterController, Namespace, PodByName};
use crate::error::{process_error, Error, Result};
use crate::metadata::{
    AppMetaData, ClusterMetaData, ClusterSpec, NamespaceMetaData, PodByNameMetaData, Uid,
};
use crate::scheduler::ScheduleOptions;

// ─── Cluster ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ClusterConfig<'a> {
    controller: &'a ClusterController,
    metadata: ClusterMetaData,
}

impl<'a> ClusterConfig<'a> {
    pub(super) fn new(controller: &'a ClusterController, config_path: String) -> Self {
        Self {
            controller,
            metadata: ClusterMetaData::new(config_path),
        }
    }

    /// Target the cluster the process runs in.
    #[must_use]
    pub fn in_cluster(mut self) -> Self {
        self.metadata = ClusterMetaData::in_cluster();
        self
    }

    pub fn metadata(&self) -> &ClusterMetaData {
        &self.metadata
    }

    pub fn uid(&self) -> String {
        self.metadata.uid()
    }

    /// Register the cluster and return its UID. Registering a cluster that is
    /// already present returns the same UID and keeps the existing entity.
    pub fn register(&self, hyperconverged: bool) -> String {
        let uid = self.uid();
        let (_, created) = self.controller.clusters.get_or_insert_with(&uid, || {
            let spec = ClusterSpec::new(self.metadata.config_path.clone(), hyperconverged);
            let requests = RequestManager::with_scheduler(Arc::clone(&self.controller.scheduler));
            Arc::new(Cluster::new(spec, requests))
        });
        if created {
            info!(cluster = %uid, hyperconverged, "registered cluster");
        }
        uid
    }

    /// Move the cluster into the removed history.
    pub fn deregister(&self) -> Result<()> {
        let uid = self.uid();
        if !self.controller.clusters.remove(&uid) {
            return Err(Error::ClusterNotRegistered(uid));
        }
        info!(cluster = %uid, "deregistered cluster");
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.controller.clusters.is_present(&self.uid())
    }

    pub fn cluster(&self) -> Result<Arc<Cluster>> {
        let uid = self.uid();
        self.controller
            .clusters
            .get(&uid)
            .ok_or(Error::ClusterNotRegistered(uid))
    }

    pub fn namespace(&self, namespace: impl Into<String>) -> NamespaceConfig<'a> {
        NamespaceConfig {
            cluster: self.clone(),
            metadata: NamespaceMetaData::new(namespace),
        }
    }
}

// ─── Namespace ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct NamespaceConfig<'a> {
    cluster: ClusterConfig<'a>,
    metadata: NamespaceMetaData,
}

impl<'a> NamespaceConfig<'a> {
    pub fn uid(&self) -> String {
        self.metadata.uid()
    }

    /// Return the namespace entity, creating it on first use.
    pub fn register(&self) -> Result<Arc<Namespace>> {
        let cluster = self.cluster.cluster()?;
        let (namespace, _) = cluster
            .namespaces()
            .get_or_insert_with(&self.uid(), || Arc::new(Namespace::new(self.metadata.clone())));
        Ok(namespace)
    }

    pub fn namespace(&self) -> Result<Arc<Namespace>> {
        let uid = self.uid();
        self.cluster
            .cluster()?
            .namespaces()
            .get(&uid)
            .ok_or(Error::NotRecorded {
                kind: "namespace",
                uid,
            })
    }

    pub fn remove(&self) -> Result<()> {
        let uid = self.uid();
        if self.cluster.cluster()?.namespaces().remove(&uid) {
            Ok(())
        } else {
            Err(Error::NotRecorded {
                kind: "namespace",
                uid,
            })
        }
    }

    pub fn app(&self, app_key: impl Into<String>, identifier: Vec<String>) -> AppConfig<'a> {
        AppConfig {
            namespace: self.clone(),
            metadata: AppMetaData::new(app_key, identifier),
        }
    }

    pub fn pod(&self, pod_name: impl Into<String>) -> PodByNameConfig<'a> {
        PodByNameConfig {
            namespace: self.clone(),
            metadata: PodByNameMetaData::new(pod_name),
        }
    }
}

// ─── App ──────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppConfig<'a> {
    namespace: NamespaceConfig<'a>,
    metadata: AppMetaData,
}

impl AppConfig<'_> {
    #[must_use]
    pub fn identified_by(mut self, identifier: Vec<String>) -> Self {
        self.metadata.identifier = identifier;
        self
    }

    pub fn metadata(&self) -> &AppMetaData {
        &self.metadata
    }

    pub fn uid(&self) -> String {
        self.metadata.uid()
    }

    fn controller(&self) -> &ClusterController {
        self.namespace.cluster.controller
    }

    /// An app can only be scheduled onto a registered cluster.
    pub fn can_schedule(&self) -> bool {
        self.namespace.cluster.is_registered()
    }

    pub fn is_scheduled(&self) -> bool {
        self.namespace
            .namespace()
            .is_ok_and(|ns| ns.apps().is_present(&self.uid()))
    }

    /// The recorded app, if it is currently scheduled.
    pub fn app(&self) -> Result<Arc<App>> {
        let uid = self.uid();
        self.namespace
            .namespace()?
            .apps()
            .get(&uid)
            .ok_or(Error::NotRecorded { kind: "app", uid })
    }

    /// Schedule the app. An app that is already scheduled has to be torn
    /// down first.
    pub async fn schedule(&self) -> Result<Arc<App>> {
        let cluster = self.namespace.cluster.cluster()?;
        let controller = self.controller();
        let uid = self.uid();
        if self.is_scheduled() {
            return Err(Error::AlreadyRecorded { kind: "app", uid });
        }

        let mut spec = controller
            .scheduler
            .app_spec(&self.metadata.app_key)
            .await
            .map_err(|e| {
                process_error(e, Some(format!("app spec '{}'", self.metadata.app_key)))
            })?;
        if self.metadata.has_identifier() {
            spec = spec.with_name_suffix(&self.metadata.suffix());
        }

        let request = ClusterRequest::Schedule(ScheduleRequest {
            apps: vec![spec],
            instance_id: uid.clone(),
            options: ScheduleOptions {
                app_keys: vec![self.metadata.app_key.clone()],
                storage_provisioner: cluster.spec.storage_provisioner.clone(),
                namespace: self.namespace.uid(),
                ..ScheduleOptions::default()
            },
        });
        let contexts = cluster
            .process_cluster_request(&controller.current, controller.switcher.as_ref(), request)
            .await?
            .into_contexts();

        let app = Arc::new(App {
            metadata: self.metadata.clone(),
            contexts,
        });
        self.namespace.register()?.apps().set(uid.clone(), Arc::clone(&app));
        info!(app = %uid, namespace = %self.namespace.uid(), "scheduled app");
        Ok(app)
    }

    /// Validate every scheduler context of the app. All failures are reported.
    pub async fn validate(&self) -> Result<()> {
        let app = self.app()?;
        let cluster = self.namespace.cluster.cluster()?;
        let controller = self.controller();
        let options = controller.settings.validate_options();

        let _active = cluster
            .context()
            .switch_context(&controller.current, controller.switcher.as_ref())
            .await?;
        let mut errors = Vec::new();
        for ctx in &app.contexts {
            if let Err(e) = controller.scheduler.validate_context(ctx, &options).await {
                warn!(context = %ctx.uid, "validation failed: {e:#}");
                errors.push(Error::Other(e.context(format!("validate {}", ctx.uid))));
            }
        }
        Error::aggregate(errors)
    }

    /// Delete the app's volumes, destroy its contexts and move it to the
    /// removed history.
    pub async fn tear_down(&self) -> Result<()> {
        let app = self.app()?;
        let cluster = self.namespace.cluster.cluster()?;
        let controller = self.controller();

        {
            let _active = cluster
                .context()
                .switch_context(&controller.current, controller.switcher.as_ref())
                .await?;
            for ctx in &app.contexts {
                controller
                    .scheduler
                    .delete_volumes(ctx)
                    .await
                    .map_err(|e| {
                        process_error(e, Some(format!("delete volumes of {}", ctx.uid)))
                    })?;
            }
        }

        let request = ClusterRequest::Destroy(DestroyRequest {
            contexts: app.contexts.clone(),
            options: controller.settings.tear_down_options(),
        });
        cluster
            .process_cluster_request(&controller.current, controller.switcher.as_ref(), request)
            .await?;

        self.namespace.namespace()?.apps().remove(&self.uid());
        info!(app = %self.uid(), "tore down app");
        Ok(())
    }
}

// ─── Pod by name ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PodByNameConfig<'a> {
    namespace: NamespaceConfig<'a>,
    metadata: PodByNameMetaData,
}

impl PodByNameConfig<'_> {
    pub fn uid(&self) -> String {
        self.metadata.uid()
    }

    pub fn register(&self) -> Result<Arc<PodByName>> {
        let namespace = self.namespace.register()?;
        let (pod, _) = namespace.pods().get_or_insert_with(&self.uid(), || {
            Arc::new(PodByName {
                metadata: self.metadata.clone(),
            })
        });
        Ok(pod)
    }

    pub fn is_registered(&self) -> bool {
        self.namespace
            .namespace()
            .is_ok_and(|ns| ns.pods().is_present(&self.uid()))
    }

    pub fn deregister(&self) -> Result<()> {
        let uid = self.uid();
        if self.namespace.namespace()?.pods().remove(&uid) {
            Ok(())
        } else {
            Err(Error::NotRecorded { kind: "pod", uid })
        }
    }
}
