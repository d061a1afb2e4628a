//! Configuration reconciler (`SPEC_FULL.md` §4.7, supplementing `spec.md` §2's
//! "Configuration reconciler" row).

use crate::config::KindRegistry;
use crate::error::Result;
use crate::events::{ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::observability::ObservabilityFacade;
use crate::store::ObjectStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Level;

pub struct ConfigurationReconciler {
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    kinds: Arc<KindRegistry>,
    obs: Arc<dyn ObservabilityFacade>,
}

impl ConfigurationReconciler {
    pub fn new(store: Arc<dyn ObjectStore>, forest: Forest, events: SharedEventBus, kinds: Arc<KindRegistry>, obs: Arc<dyn ObservabilityFacade>) -> Self {
        Self { store, forest, events, kinds, obs }
    }

    /// Reconciles the single cluster-scoped HNC configuration document.
    pub async fn reconcile(&self) -> Result<()> {
        let log = self.obs.logger();
        let mut doc = self.store.get_hnc_config().await?;

        let mut seen = HashSet::new();
        let mut deduped = Vec::new();
        for entry in doc.kinds.drain(..) {
            let dup_key = (entry.gvk.group.clone(), entry.gvk.kind.clone());
            if seen.insert(dup_key) {
                deduped.push(entry);
            } else {
                log.log(Level::WARN, "hnc-configuration", &format!("dropping duplicate kind entry {:?}", entry.gvk));
            }
        }
        doc.kinds = deduped.clone();

        let changed = self.kinds.replace(deduped.iter().map(|e| (e.gvk.clone(), e.mode)));
        self.store.put_hnc_config(doc).await?;

        if !changed.is_empty() {
            // A mode transition requires a full re-sweep (`spec.md` §4.3).
            // Driving it through the hierarchy reconciler reuses its
            // existing per-namespace type-syncer fan-out rather than
            // duplicating that logic here.
            let all_namespaces = self.forest.with_lock(|g| g.names());
            log.log(Level::INFO, "hnc-configuration", &format!("{} kind(s) changed mode, re-sweeping {} namespaces", changed.len(), all_namespaces.len()));
            self.events.enqueue_many(ReconcilerKind::Hierarchy, all_namespaces);
        }
        Ok(())
    }
}
