//! The reconcile pipeline: one module per reconciler kind (`spec.md` §4.2–§4.5,
//! §4.7), all driven through the same `Forest`/`ObjectStore`/`EventBus` seam.
//!
//! Grounded on `spark-core`'s pipeline stage shape: fetch external state,
//! lock-mutate-compute an affected set, unlock, flush writes and deferred
//! enqueues (`spec.md` §4.1, §5). Every reconciler in this module follows
//! that same four-step shape.

mod anchor;
mod config_reconciler;
mod drift;
mod hierarchy;
mod hrq_document;
mod propagator;
mod rq_singleton;

pub use anchor::AnchorReconciler;
pub use config_reconciler::ConfigurationReconciler;
pub use drift::DriftReconciler;
pub use hierarchy::HierarchyReconciler;
pub use hrq_document::HrqDocumentReconciler;
pub use propagator::ObjectPropagator;
pub use rq_singleton::RqSingletonReconciler;

use crate::config::KindRegistry;
use crate::events::{ReconcilerKind, SharedEventBus};
use crate::model::PropagationMode;

/// Enqueues a per-namespace refresh onto every propagator not currently in
/// `Ignore` mode. Used after any change material enough that propagated
/// objects may need resyncing (`spec.md` §4.2 step 5: "call all registered
/// type syncers' per-namespace refresh").
pub(crate) fn enqueue_all_kinds(events: &SharedEventBus, kinds: &KindRegistry, namespaces: &[String]) {
    if namespaces.is_empty() {
        return;
    }
    let snapshot = kinds.snapshot();
    for (index, (_, mode)) in snapshot.kinds().enumerate() {
        if *mode != PropagationMode::Ignore {
            events.enqueue_many(ReconcilerKind::Propagator(index as u32), namespaces.to_vec());
        }
    }
}
