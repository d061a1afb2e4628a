//! Drift reconciliation (`spec.md` §4.4, "Drift reconciliation"): a periodic
//! belt-and-braces recomputation of subtree usage from scratch.

use crate::events::{ReconcilerKind, SharedEventBus};
use crate::forest::Forest;
use crate::observability::ObservabilityFacade;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

pub struct DriftReconciler {
    forest: Forest,
    events: SharedEventBus,
    obs: Arc<dyn ObservabilityFacade>,
}

impl DriftReconciler {
    pub fn new(forest: Forest, events: SharedEventBus, obs: Arc<dyn ObservabilityFacade>) -> Self {
        Self { forest, events, obs }
    }

    /// One drift-reconciliation pass: recompute `used_subtree` top-down from
    /// every root and re-enqueue any namespace whose aggregate actually
    /// changed (P4).
    pub fn tick(&self) {
        let log = self.obs.logger();
        let roots = self.forest.with_lock(|g| g.names().into_iter().filter(|n| g.get(n).parent.is_none()).collect::<Vec<_>>());
        let mut affected = Vec::new();
        self.forest.with_lock(|g| {
            for root in &roots {
                affected.extend(g.recompute_subtree_drift(root).into_vec());
            }
        });
        if !affected.is_empty() {
            log.log(Level::INFO, "drift", &format!("drift pass corrected subtree usage for {} namespace(s)", affected.len()));
            self.events.enqueue_many(ReconcilerKind::RqSingleton, affected);
        } else {
            log.log(Level::DEBUG, "drift", "drift pass found no discrepancies");
        }
    }

    /// Runs `tick` on `period`, forever. Intended to be spawned once by the
    /// host binary; this is the only reconciler driven by a timer rather
    /// than the reconcile-request stream.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.tick();
        }
    }
}
