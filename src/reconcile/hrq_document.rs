//! HRQ document reconciler (`spec.md` §4.4.1).

use crate::error::Result;
use crate::events::{ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::model::filter_to;
use crate::observability::ObservabilityFacade;
use crate::store::ObjectStore;
use std::sync::Arc;
use tracing::Level;

pub struct HrqDocumentReconciler {
    store: Arc<dyn ObjectStore>,
    forest: Forest,
    events: SharedEventBus,
    obs: Arc<dyn ObservabilityFacade>,
}

impl HrqDocumentReconciler {
    pub fn new(store: Arc<dyn ObjectStore>, forest: Forest, events: SharedEventBus, obs: Arc<dyn ObservabilityFacade>) -> Self {
        Self { store, forest, events, obs }
    }

    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<()> {
        let log = self.obs.logger();
        let Some(mut doc) = self.store.get_hrq(namespace, name).await? else {
            self.forest.with_lock(|g| g.remove_limits(namespace, name));
            let subtree = self.forest.with_lock(|g| {
                let mut ns = g.descendants(namespace);
                ns.push(namespace.to_string());
                ns
            });
            self.events.enqueue_many(ReconcilerKind::RqSingleton, subtree);
            return Ok(());
        };

        let hard = doc.hard.clone();
        let used_subtree = self.forest.with_lock(|g| {
            g.update_limits(namespace, name, hard.clone());
            g.get(namespace).quotas.used_subtree.clone()
        });

        doc.status_hard = hard.clone();
        doc.status_used = filter_to(&used_subtree, &hard);
        let (request_summary, limit_summary) = summarize(&doc.status_used, &doc.status_hard);
        doc.status_request_summary = request_summary;
        doc.status_limit_summary = limit_summary;

        self.store.put_hrq(doc).await?;

        let subtree = self.forest.with_lock(|g| {
            let mut ns = g.descendants(namespace);
            ns.push(namespace.to_string());
            ns
        });
        log.log(Level::DEBUG, "hrq-document", &format!("reconciled {namespace}/{name}, {} namespaces marked for refresh", subtree.len()));
        self.events.enqueue_many(ReconcilerKind::RqSingleton, subtree);
        Ok(())
    }
}

/// Builds the stable, alphabetically-ordered human-readable summary strings:
/// resources named `limits.*` go in the limit summary, everything else in
/// the request summary (`spec.md` §4.4.1).
fn summarize(used: &crate::model::ResourceList, hard: &crate::model::ResourceList) -> (String, String) {
    let mut requests = Vec::new();
    let mut limits = Vec::new();
    for (resource, hard_qty) in hard {
        let used_qty = used.get(resource).copied().unwrap_or(0);
        let entry = format!("{resource}: {used_qty}/{hard_qty}");
        if resource.starts_with("limits.") {
            limits.push(entry);
        } else {
            requests.push(entry);
        }
    }
    (requests.join(", "), limits.join(", "))
}
