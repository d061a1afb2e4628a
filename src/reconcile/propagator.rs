//! Object propagator, one instance per propagated kind (`spec.md` §4.3).

use crate::config::{ConfigurationSource, KindRegistry};
use crate::error::Result;
use crate::events::SharedEventBus;
use crate::forest::Forest;
use crate::model::{Gvk, ObjectKey, PropagationMode};
use crate::observability::ObservabilityFacade;
use crate::store::{ObjectStore, PropagatedObjectDoc};
use std::sync::Arc;
use tracing::Level;

/// Kinds whose immutable fields (e.g. a RoleBinding's role reference) force
/// an update to go via delete-then-create rather than an in-place overwrite
/// (`spec.md` §4.3, "Rolebinding updates get a delete-then-create fallback").
/// Extending this beyond RoleBindings is Open Question (iii) in `spec.md`
/// §9, resolved in `DESIGN.md`.
fn requires_delete_then_create(gvk: &Gvk) -> bool {
    gvk.kind == "RoleBinding"
}

pub struct ObjectPropagator {
    gvk: Gvk,
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    config: Arc<dyn ConfigurationSource>,
    kinds: Arc<KindRegistry>,
    obs: Arc<dyn ObservabilityFacade>,
}

impl ObjectPropagator {
    pub fn new(
        gvk: Gvk,
        store: Arc<dyn ObjectStore>,
        forest: Forest,
        events: SharedEventBus,
        config: Arc<dyn ConfigurationSource>,
        kinds: Arc<KindRegistry>,
        obs: Arc<dyn ObservabilityFacade>,
    ) -> Self {
        Self { gvk, store, forest, events, config, kinds, obs }
    }

    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<()> {
        let log = self.obs.logger();
        let cfg = self.config.snapshot();
        let mode = self.kinds.mode(&self.gvk);

        // Step 1.
        if cfg.is_excluded(namespace) || mode == PropagationMode::Ignore {
            return Ok(());
        }

        // Step 2 (missing is a valid state).
        let existing = self.store.get_object(&self.gvk, namespace, name).await?;
        let key = ObjectKey { gvk: self.gvk.clone(), name: name.to_string() };

        if let Some(obj) = &existing {
            if !obj.finalizers.is_empty() || obj.is_service_account_token {
                return Ok(());
            }
        }

        // Step 3: under the forest lock, decide source vs. copy and what to do.
        enum Action {
            Nothing,
            DeleteStale,
            CreateOrOverwrite { from_namespace: String },
        }

        let action = self.forest.with_lock(|g| {
            if g.get(namespace).is_halted() {
                // "the decision is computed but no action is taken"
                return Action::Nothing;
            }

            let is_copy = existing.as_ref().and_then(|o| o.inherited_from.clone()).is_some();

            if mode == PropagationMode::Remove {
                return if is_copy { Action::DeleteStale } else { Action::Nothing };
            }

            let effective_source = g.effective_source(namespace, &key);

            match (&existing, is_copy, &effective_source) {
                (Some(obj), false, Some(source)) if source != namespace => {
                    // A conflicting local source shadowed by an ancestor's.
                    // `spec.md` §4.3: "A propagator in Propagate mode with a
                    // conflicting ancestor will overwrite a local source."
                    if mode == PropagationMode::Propagate {
                        g.set_source(namespace, key.clone(), false, None);
                        Action::CreateOrOverwrite { from_namespace: source.clone() }
                    } else {
                        let _ = obj;
                        Action::Nothing
                    }
                }
                (_, _, Some(source)) if source != namespace => {
                    if mode == PropagationMode::AllowPropagate {
                        // Only propagate into namespaces whose source
                        // explicitly opted in via a selector annotation.
                        let opted_in = g
                            .try_get(source)
                            .and_then(|n| n.source_objects.get(&key))
                            .map(|s| s.selector.is_some())
                            .unwrap_or(false);
                        if !opted_in {
                            return Action::Nothing;
                        }
                    }
                    Action::CreateOrOverwrite { from_namespace: source.clone() }
                }
                (Some(_), true, None) => {
                    // Stale propagated copy: its source no longer resolves.
                    Action::DeleteStale
                }
                _ => Action::Nothing,
            }
        });

        // Step 4: outside the lock.
        match action {
            Action::Nothing => {}
            Action::DeleteStale => {
                self.store.delete_object(&self.gvk, namespace, name).await?;
                log.log(Level::DEBUG, "propagator", &format!("deleted stale copy {namespace}/{name}"));
            }
            Action::CreateOrOverwrite { from_namespace } => {
                let Some(source_obj) = self.store.get_object(&self.gvk, &from_namespace, name).await? else {
                    return Ok(());
                };
                let selector = source_obj.selector.clone();
                if let Some(selector) = &selector {
                    let included = self.forest.with_lock(|g| g.selector_includes(namespace, selector));
                    if !included {
                        return Ok(());
                    }
                }

                let mut copy = source_obj.clone();
                copy.namespace = namespace.to_string();
                copy.inherited_from = Some(from_namespace.clone());
                if let Some(existing) = &existing {
                    copy.resource_version = existing.resource_version.clone();
                }
                copy.labels.insert("app.kubernetes.io/managed-by".to_string(), "hnc".to_string());
                copy.annotations.retain(|k, _| !k.starts_with(cfg.selector_annotation_prefix().as_str()));

                let needs_delete_then_create =
                    existing.is_some() && requires_delete_then_create(&self.gvk) && existing.as_ref() != Some(&copy);
                if needs_delete_then_create {
                    self.store.delete_object(&self.gvk, namespace, name).await?;
                }
                self.write_copy(copy).await?;
                log.log(Level::DEBUG, "propagator", &format!("propagated {from_namespace}/{name} -> {namespace}/{name}"));
            }
        }

        Ok(())
    }

    async fn write_copy(&self, copy: PropagatedObjectDoc) -> Result<()> {
        self.store.put_object(copy).await
    }

    /// Per-namespace refresh (`spec.md` §4.2 step 5): re-checks every name
    /// that could plausibly need a copy of this kind in `namespace`, namely
    /// every object of this kind already present and every name recorded as
    /// a propagatable source anywhere in `namespace`'s ancestry.
    pub async fn sweep_namespace(&self, namespace: &str) -> Result<()> {
        let mut names: std::collections::BTreeSet<String> =
            self.store.list_objects(&self.gvk, namespace).await?.into_iter().map(|o| o.name).collect();
        let ancestor_names = self.forest.with_lock(|g| {
            let mut out = Vec::new();
            for ancestor in g.ancestry(namespace) {
                if let Some(node) = g.try_get(&ancestor) {
                    out.extend(node.source_objects.keys().filter(|k| k.gvk == self.gvk).map(|k| k.name.clone()));
                }
            }
            out
        });
        names.extend(ancestor_names);
        for name in names {
            self.reconcile(namespace, &name).await?;
        }
        Ok(())
    }

    /// Records or clears `name` as a locally-owned source object in the
    /// forest; called by the object validator and by a watch on source
    /// writes (not modeled as a separate reconcile step since the forest
    /// update is small enough to do inline wherever the write is observed).
    pub fn record_source(&self, namespace: &str, name: &str, propagatable: bool, selector: Option<crate::forest::Selector>) {
        let key = ObjectKey { gvk: self.gvk.clone(), name: name.to_string() };
        self.forest.with_lock(|g| g.set_source(namespace, key, propagatable, selector));
    }

    pub fn clear_source(&self, namespace: &str, name: &str) {
        let key = ObjectKey { gvk: self.gvk.clone(), name: name.to_string() };
        self.forest.with_lock(|g| g.clear_source(namespace, &key));
    }
}
