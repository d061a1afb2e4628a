//! Per-namespace resource-quota singleton reconciler (`spec.md` §4.4.2).

use crate::error::Result;
use crate::events::{join_pair, ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::observability::ObservabilityFacade;
use crate::store::{ObjectStore, RqSingletonDoc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Level;

pub struct RqSingletonReconciler {
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    obs: Arc<dyn ObservabilityFacade>,
}

impl RqSingletonReconciler {
    pub fn new(store: Arc<dyn ObjectStore>, forest: Forest, events: SharedEventBus, obs: Arc<dyn ObservabilityFacade>) -> Self {
        Self { store, forest, events, obs }
    }

    pub async fn reconcile(&self, namespace: &str) -> Result<()> {
        let log = self.obs.logger();
        let limits = self.forest.with_lock(|g| g.effective_limits(namespace));
        let existing = self.store.get_rq_singleton(namespace).await?;

        if limits.is_empty() {
            if existing.is_some() {
                self.store.delete_rq_singleton(namespace).await?;
                log.log(Level::DEBUG, "rq-singleton", &format!("removed singleton for {namespace}: no limits in effect"));
            }
        } else {
            let needs_write = existing.as_ref().map(|s| s.spec_hard != limits).unwrap_or(true);
            if needs_write {
                let mut labels = BTreeMap::new();
                labels.insert("hnc.example.io/cleanup".to_string(), "true".to_string());
                let mut annotations = BTreeMap::new();
                annotations.insert("hnc.example.io/non-propagate".to_string(), "true".to_string());
                let doc = RqSingletonDoc {
                    namespace: namespace.to_string(),
                    spec_hard: limits,
                    status_used: existing.as_ref().map(|s| s.status_used.clone()).unwrap_or_default(),
                    labels,
                    annotations,
                };
                self.store.put_rq_singleton(doc).await?;
            }
        }

        // Observation path: fold the platform's own reported usage into the
        // forest as ground truth.
        let observed_used = existing.map(|s| s.status_used).unwrap_or_default();
        let ancestry = self.forest.with_lock(|g| {
            g.use_resources(namespace, observed_used);
            g.ancestry(namespace)
        });

        let mut refresh = Vec::new();
        self.forest.with_lock(|g| {
            for ancestor in &ancestry {
                for hrq_name in g.get(ancestor).quotas.limits.keys() {
                    refresh.push((ancestor.clone(), hrq_name.clone()));
                }
            }
        });
        for (ns, hrq_name) in refresh {
            self.events.enqueue(ReconcilerKind::HrqDocument, join_pair(&ns, &hrq_name));
        }
        Ok(())
    }
}
