//! Hierarchy reconciler (`spec.md` §4.2): reconciles one namespace's hierarchy
//! document and namespace object against the forest.

use super::enqueue_all_kinds;
use crate::config::{ConfigurationSource, KindRegistry};
use crate::error::Result;
use crate::events::{ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::model::{Condition, ConditionReason};
use crate::observability::ObservabilityFacade;
use crate::store::ObjectStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Level;

pub struct HierarchyReconciler {
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    config: Arc<dyn ConfigurationSource>,
    kinds: Arc<KindRegistry>,
    obs: Arc<dyn ObservabilityFacade>,
}

impl HierarchyReconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        forest: Forest,
        events: SharedEventBus,
        config: Arc<dyn ConfigurationSource>,
        kinds: Arc<KindRegistry>,
        obs: Arc<dyn ObservabilityFacade>,
    ) -> Self {
        Self { store, forest, events, config, kinds, obs }
    }

    /// Drives one namespace through `spec.md` §4.2 steps 1–5.
    pub async fn reconcile(&self, namespace: &str) -> Result<()> {
        let log = self.obs.logger();
        let cfg = self.config.snapshot();

        // Step 1: namespace absent.
        let Some(mut ns_obj) = self.store.get_namespace(namespace).await? else {
            let affected = self.forest.with_lock(|g| {
                g.get_mut(namespace).exists = false;
                g.relative_names(namespace)
            });
            log.log(Level::DEBUG, "hierarchy", &format!("{namespace} is no longer observed"));
            self.events.enqueue_many(ReconcilerKind::Hierarchy, affected);
            return Ok(());
        };

        // Step 2: excluded namespace — strip HNC-owned state, exit.
        if cfg.is_excluded(namespace) {
            if let Some(mut doc) = self.store.get_hierarchy(namespace).await? {
                if doc.finalized || !doc.managed_labels.is_empty() || !doc.managed_annotations.is_empty() {
                    doc.finalized = false;
                    doc.managed_labels.clear();
                    doc.managed_annotations.clear();
                    self.store.put_hierarchy(namespace, doc).await?;
                }
            }
            return Ok(());
        }

        let mut doc = self.store.get_hierarchy(namespace).await?.unwrap_or_default();
        // Step 3: anchor in the parent's namespace naming us as its child.
        let parent_anchor = self.store.find_anchor_for_child(namespace).await?;
        let anchors_here = self.store.list_anchors(namespace).await?;
        let is_deleting = ns_obj.deletion_timestamp_set;

        if let Some(anchor) = &parent_anchor {
            // "If a subnamespace is being deleted, ignore the parent linkage
            // to allow clean teardown."
            if !is_deleting {
                doc.spec_parent = Some(anchor.owner_namespace.clone());
                for (k, v) in &anchor.labels {
                    doc.managed_labels.insert(k.clone(), v.clone());
                }
                for (k, v) in &anchor.annotations {
                    doc.managed_annotations.insert(k.clone(), v.clone());
                }
            }
        }

        let is_sub = parent_anchor.is_some();
        let target_parent = doc.spec_parent.clone();
        let manager = ns_obj.manager.clone();

        let mut bad_config = Vec::new();
        let allowed_labels: BTreeMap<String, String> = doc
            .managed_labels
            .iter()
            .filter(|(k, _)| {
                let ok = cfg.label_key_allowed(k);
                if !ok {
                    bad_config.push(Condition::bad_config(
                        ConditionReason::IllegalManagedLabel,
                        format!("managed label key {k} is not in the allowed set"),
                    ));
                }
                ok
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let allowed_annotations: BTreeMap<String, String> = doc
            .managed_annotations
            .iter()
            .filter(|(k, _)| {
                let ok = cfg.annotation_key_allowed(k);
                if !ok {
                    bad_config.push(Condition::bad_config(
                        ConditionReason::IllegalManagedAnnotation,
                        format!("managed annotation key {k} is not in the allowed set"),
                    ));
                }
                ok
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        // Step 4: forest lock.
        let (affected, tree_labels, children, conditions) = self.forest.with_lock(|g| {
            {
                let node = g.get_mut(namespace);
                node.exists = true;
                node.manager = manager.clone();
                node.is_sub = is_sub;
                node.allow_cascading_deletion = doc.allow_cascading_deletion;
                node.anchors = anchors_here.iter().map(|a| a.child_name.clone()).collect();
            }

            // I3: external namespaces never get an HNC-assigned parent,
            // regardless of what the hierarchy document asks for.
            let safe_parent = if manager.is_internal() { target_parent.as_deref() } else { None };
            let mut affected = g.set_parent(namespace, safe_parent);

            let node = g.get_mut(namespace);
            node.conditions.retain(|c| {
                !matches!(
                    c.reason,
                    ConditionReason::IllegalParent
                        | ConditionReason::ParentMissing
                        | ConditionReason::IllegalManagedLabel
                        | ConditionReason::IllegalManagedAnnotation
                        | ConditionReason::DeletingCrd
                )
            });
            node.conditions.extend(bad_config.clone());
            if !manager.is_internal() && target_parent.is_some() {
                node.conditions.push(Condition::halted(
                    ConditionReason::IllegalParent,
                    format!("{namespace} is externally managed and may not have a parent"),
                ));
            }
            if cfg.hierarchy_kind_removing {
                node.conditions.push(Condition::halted(ConditionReason::DeletingCrd, "the hierarchy kind is being removed"));
            }
            if let Some(p) = &target_parent {
                if manager.is_internal() {
                    let parent_exists = g.try_get(p).map(|n| n.exists).unwrap_or(false);
                    if !parent_exists {
                        g.get_mut(namespace).conditions.push(Condition::halted(
                            ConditionReason::ParentMissing,
                            format!("parent {p} has not been observed"),
                        ));
                    }
                }
            }

            g.recompute_cycle_condition(namespace);
            g.recompute_halted_ancestor(namespace);
            g.recompute_tree_labels(namespace);

            let node = g.get(namespace);
            let snapshot = (node.tree_labels.clone(), node.children.iter().cloned().collect::<Vec<_>>(), node.conditions.clone());
            affected.insert(namespace.to_string());
            (affected, snapshot.0, snapshot.1, snapshot.2)
        });

        doc.managed_labels = allowed_labels.clone();
        doc.managed_annotations = allowed_annotations.clone();
        doc.status_children = children;
        doc.status_conditions = conditions;
        // "The hierarchy singleton is kept finalised iff the namespace
        // contains anchors and is not being singly deleted."
        doc.finalized = !anchors_here.is_empty() && !is_deleting;

        for (k, v) in &allowed_labels {
            ns_obj.labels.insert(k.clone(), v.clone());
        }
        for (ancestor, depth) in &tree_labels {
            ns_obj.labels.insert(cfg.tree_label_key(ancestor), depth.to_string());
        }

        // Step 5: release lock (already released), flush writes and enqueues.
        self.store.put_hierarchy(namespace, doc).await?;
        self.store.put_namespace(ns_obj).await?;

        let affected = affected.into_vec();
        log.log(Level::DEBUG, "hierarchy", &format!("reconciled {namespace}, {} affected", affected.len()));
        self.events.enqueue_many(ReconcilerKind::Hierarchy, affected.clone());
        enqueue_all_kinds(&self.events, &self.kinds, &affected);
        self.events.enqueue_many(ReconcilerKind::RqSingleton, affected);
        Ok(())
    }
}
