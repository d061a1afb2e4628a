//! The top-level facade: wires the `Forest`, every reconciler, every
//! admission validator, the `EventBus`, an `ObjectStore` and a
//! `ConfigurationSource` together, and exposes the CLI-surface operations
//! `spec.md` §6 names (set/clear parent, describe hierarchy, create/delete
//! subnamespace, configure propagated kinds, list HRQs with usage, mark
//! cascading deletion) for a host binary to call. `SPEC_FULL.md` §0 models
//! the CLI plugin, watch plumbing and controller-framework glue themselves
//! as external collaborators; this module is the trait boundary
//! ([`ReconcileDriver`]) a host binary drives against, grounded on
//! `spark-core::runtime`'s dispatcher-owns-the-handler-table shape.

use crate::admission::{AlwaysValidNames, ConfigValidator, HierarchyValidator, HrqValidator, NamespaceValidator, ObjectValidator, QuotaAdmissionHook};
use crate::config::{ConfigurationSource, KindRegistry};
use crate::error::{HncError, Result};
use crate::events::{join_pair, split_pair, EventBus, EventBusReceiver, ReconcileRequest, ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::model::{Condition, Manager};
use crate::observability::ObservabilityFacade;
use crate::reconcile::{AnchorReconciler, ConfigurationReconciler, DriftReconciler, HierarchyReconciler, HrqDocumentReconciler, ObjectPropagator, RqSingletonReconciler};
use crate::store::{AnchorDoc, HierarchyDoc, HncConfigDoc, HrqDoc, KindConfigEntry, ObjectStore};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// A read model for the CLI "describe hierarchy" operation (`spec.md` §6);
/// not a persisted document, just a snapshot of forest-derived state.
#[derive(Clone, Debug)]
pub struct HierarchyDescription {
    pub namespace: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub tree_labels: BTreeMap<String, u32>,
    pub conditions: Vec<Condition>,
    pub is_sub: bool,
    pub manager: Manager,
}

/// Something that can take one [`ReconcileRequest`] off the stream and
/// carry it to completion. A host binary implementing its own
/// watch-to-request bridge only ever needs to call `dispatch`; [`Controller`]
/// is this crate's own implementation; a host may substitute its own (e.g.
/// one that shards dispatch across a worker pool) as long as it preserves
/// the same reconciler semantics.
#[async_trait]
pub trait ReconcileDriver: Send + Sync {
    async fn dispatch(&self, request: ReconcileRequest) -> Result<()>;
}

pub struct Controller {
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    config: Arc<dyn ConfigurationSource>,
    kinds: Arc<KindRegistry>,
    obs: Arc<dyn ObservabilityFacade>,
    drift_period: Duration,

    hierarchy: HierarchyReconciler,
    anchor: AnchorReconciler,
    hrq_document: HrqDocumentReconciler,
    rq_singleton: RqSingletonReconciler,
    config_reconciler: ConfigurationReconciler,
    drift: Arc<DriftReconciler>,
    /// Indexed in parallel with `kinds.snapshot().kinds()`'s sorted
    /// iteration order; rebuilt by [`Controller::reconcile_config`]
    /// immediately after every `KindRegistry::replace`, since
    /// `ReconcilerKind::Propagator(index)` addresses a propagator by that
    /// positional index rather than by `Gvk` (`spec.md` §9, dynamic kind
    /// registry design note; see `DESIGN.md` for why this coupling exists
    /// instead of keying `Propagator` requests by `Gvk` directly).
    propagators: ArcSwap<Vec<Arc<ObjectPropagator>>>,

    pub hierarchy_validator: HierarchyValidator,
    pub object_validator: ObjectValidator,
    pub namespace_validator: NamespaceValidator,
    pub config_validator: ConfigValidator,
    pub hrq_validator: HrqValidator<AlwaysValidNames>,
    pub quota_hook: QuotaAdmissionHook,
}

impl Controller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: Arc<dyn ConfigurationSource>,
        authorizer: Arc<dyn crate::admission::Authorizer>,
        obs: Arc<dyn ObservabilityFacade>,
        event_capacity: usize,
        drift_period: Duration,
    ) -> (Arc<Self>, EventBusReceiver) {
        let forest = Forest::new();
        let kinds = Arc::new(KindRegistry::new());
        let (events, receiver) = EventBus::new(event_capacity);
        let events: SharedEventBus = Arc::new(events);

        let hierarchy = HierarchyReconciler::new(store.clone(), forest.clone(), events.clone(), config.clone(), kinds.clone(), obs.clone());
        let anchor = AnchorReconciler::new(store.clone(), forest.clone(), events.clone(), obs.clone());
        let hrq_document = HrqDocumentReconciler::new(store.clone(), forest.clone(), events.clone(), obs.clone());
        let rq_singleton = RqSingletonReconciler::new(store.clone(), forest.clone(), events.clone(), obs.clone());
        let config_reconciler = ConfigurationReconciler::new(store.clone(), forest.clone(), events.clone(), kinds.clone(), obs.clone());
        let drift = Arc::new(DriftReconciler::new(forest.clone(), events.clone(), obs.clone()));

        let hierarchy_validator = HierarchyValidator::new(forest.clone(), config.clone(), authorizer);
        let object_validator = ObjectValidator::new(forest.clone(), kinds.clone());
        let namespace_validator = NamespaceValidator::new(forest.clone(), config.clone());
        let config_validator = ConfigValidator::new(forest.clone());
        let hrq_validator = HrqValidator::new(AlwaysValidNames);
        let quota_hook = QuotaAdmissionHook::new(forest.clone());

        let controller = Arc::new(Self {
            store,
            forest,
            events,
            config,
            kinds,
            obs,
            drift_period,
            hierarchy,
            anchor,
            hrq_document,
            rq_singleton,
            config_reconciler,
            drift,
            propagators: ArcSwap::from_pointee(Vec::new()),
            hierarchy_validator,
            object_validator,
            namespace_validator,
            config_validator,
            hrq_validator,
            quota_hook,
        });
        controller.rebuild_propagators();
        (controller, receiver)
    }

    fn rebuild_propagators(&self) {
        let snapshot = self.kinds.snapshot();
        let list: Vec<Arc<ObjectPropagator>> = snapshot
            .kinds()
            .map(|(gvk, _)| {
                Arc::new(ObjectPropagator::new(
                    gvk.clone(),
                    self.store.clone(),
                    self.forest.clone(),
                    self.events.clone(),
                    self.config.clone(),
                    self.kinds.clone(),
                    self.obs.clone(),
                ))
            })
            .collect();
        self.propagators.store(Arc::new(list));
    }

    /// Reconciles the cluster-scoped HNC configuration document, then
    /// rebuilds the propagator table so `Propagator(index)` requests issued
    /// after this call address the post-change kind set. Must run to
    /// completion (including the rebuild) before any `Propagator` request
    /// enqueued as part of the resulting resweep is dispatched, which holds
    /// here because `run` drains `EventBusReceiver` on a single task.
    pub async fn reconcile_config(&self) -> Result<()> {
        self.config_reconciler.reconcile().await?;
        self.rebuild_propagators();
        Ok(())
    }

    // ---- CLI surface (spec.md §6) ----

    pub async fn set_parent(&self, namespace: &str, parent: Option<String>) -> Result<()> {
        let mut doc = self.store.get_hierarchy(namespace).await?.unwrap_or_default();
        doc.spec_parent = parent;
        self.store.put_hierarchy(namespace, doc).await?;
        self.events.enqueue(ReconcilerKind::Hierarchy, namespace.to_string());
        Ok(())
    }

    pub async fn clear_parent(&self, namespace: &str) -> Result<()> {
        self.set_parent(namespace, None).await
    }

    pub fn describe_hierarchy(&self, namespace: &str) -> Option<HierarchyDescription> {
        self.forest.with_lock(|g| {
            g.try_get(namespace).map(|node| HierarchyDescription {
                namespace: namespace.to_string(),
                parent: node.parent.clone(),
                children: node.children.iter().cloned().collect(),
                tree_labels: node.tree_labels.clone(),
                conditions: node.conditions.clone(),
                is_sub: node.is_sub,
                manager: node.manager.clone(),
            })
        })
    }

    pub async fn create_subnamespace(&self, owner: &str, child: &str, labels: BTreeMap<String, String>, annotations: BTreeMap<String, String>) -> Result<()> {
        let anchor = AnchorDoc {
            owner_namespace: owner.to_string(),
            child_name: child.to_string(),
            labels,
            annotations,
            status: crate::model::AnchorState::Missing,
        };
        self.store.put_anchor(anchor).await?;
        self.events.enqueue(ReconcilerKind::Anchor, join_pair(owner, child));
        Ok(())
    }

    pub async fn delete_subnamespace(&self, owner: &str, child: &str) -> Result<()> {
        self.store.delete_anchor(owner, child).await?;
        self.events.enqueue(ReconcilerKind::Anchor, join_pair(owner, child));
        Ok(())
    }

    pub async fn configure_propagated_kinds(&self, kinds: Vec<KindConfigEntry>, excluded_namespaces: Vec<String>) -> Result<()> {
        let doc = HncConfigDoc { kinds, excluded_namespaces };
        self.store.put_hnc_config(doc).await?;
        self.events.enqueue(ReconcilerKind::HncConfiguration, String::new());
        Ok(())
    }

    pub async fn list_hrqs_with_usage(&self, namespace: &str) -> Result<Vec<HrqDoc>> {
        self.store.list_hrqs(namespace).await
    }

    pub async fn mark_cascading_deletion(&self, namespace: &str, allow: bool) -> Result<()> {
        let mut doc = self.store.get_hierarchy(namespace).await?.unwrap_or_default();
        doc.allow_cascading_deletion = allow;
        self.store.put_hierarchy(namespace, doc).await?;
        self.events.enqueue(ReconcilerKind::Hierarchy, namespace.to_string());
        Ok(())
    }

    /// Drains the reconcile-request stream forever, dispatching each
    /// request and re-enqueueing on a transient error (`spec.md` §7). Also
    /// spawns the periodic drift reconciler (`spec.md` §4.4 "Drift
    /// reconciliation"). Intended to be the one long-running task a host
    /// binary spawns after wiring everything else up.
    pub async fn run(self: Arc<Self>, mut receiver: EventBusReceiver) {
        tokio::spawn(self.drift.clone().run(self.drift_period));

        let log = self.obs.logger();
        while let Some(request) = receiver.rx.recv().await {
            let kind = request.kind;
            let key = request.namespace.clone();
            if let Err(err) = self.dispatch(request).await {
                if err.is_retryable() {
                    log.log(Level::WARN, "controller", &format!("transient error reconciling {kind} {key}: {err}, re-enqueueing"));
                    self.events.enqueue(kind, key);
                } else {
                    log.log(Level::ERROR, "controller", &format!("non-retryable error reconciling {kind} {key}: {err}"));
                }
            }
        }
    }
}

#[async_trait]
impl ReconcileDriver for Controller {
    async fn dispatch(&self, request: ReconcileRequest) -> Result<()> {
        match request.kind {
            ReconcilerKind::Hierarchy => self.hierarchy.reconcile(&request.namespace).await,
            ReconcilerKind::RqSingleton => self.rq_singleton.reconcile(&request.namespace).await,
            ReconcilerKind::HncConfiguration => self.reconcile_config().await,
            ReconcilerKind::Anchor => {
                let (owner, child) = split_pair(&request.namespace)
                    .ok_or_else(|| HncError::Internal { message: format!("malformed anchor reconcile key {}", request.namespace) })?;
                self.anchor.reconcile(owner, child).await
            }
            ReconcilerKind::HrqDocument => {
                let (namespace, name) = split_pair(&request.namespace)
                    .ok_or_else(|| HncError::Internal { message: format!("malformed HRQ reconcile key {}", request.namespace) })?;
                self.hrq_document.reconcile(namespace, name).await
            }
            ReconcilerKind::Propagator(index) => {
                let propagators = self.propagators.load();
                let Some(propagator) = propagators.get(index as usize) else { return Ok(()) };
                propagator.sweep_namespace(&request.namespace).await
            }
        }
    }
}
