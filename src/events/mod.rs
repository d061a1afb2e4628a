//! The generic-event fan-out network that lets a reconciler enqueue
//! *other* reconcilers' work once it releases the forest lock (`spec.md`
//! §4.1, §5, §9 "Event fan-out").
//!
//! Grounded on `spark-core::runtime`'s task/executor split: a reconciler
//! never blocks on delivery itself (that would risk deadlocking a lock
//! holder against a full channel), so enqueues are always dispatched from a
//! background task via [`tokio::task::spawn`], matching the "background
//! dispatch tasks" design note in `spec.md` §9.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which reconciler kind a [`ReconcileRequest`] targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcilerKind {
    Hierarchy,
    Propagator(u32),
    Anchor,
    HrqDocument,
    RqSingleton,
    HncConfiguration,
}

impl fmt::Display for ReconcilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcilerKind::Hierarchy => write!(f, "hierarchy"),
            ReconcilerKind::Propagator(id) => write!(f, "propagator[{id}]"),
            ReconcilerKind::Anchor => write!(f, "anchor"),
            ReconcilerKind::HrqDocument => write!(f, "hrq-document"),
            ReconcilerKind::RqSingleton => write!(f, "rq-singleton"),
            ReconcilerKind::HncConfiguration => write!(f, "hnc-configuration"),
        }
    }
}

/// One unit of enqueued work: "look at this key again". For `Hierarchy`,
/// `RqSingleton` and a bare `Propagator` namespace resweep, `key` is a plain
/// namespace name. `HrqDocument` and `Anchor` address a (container, item)
/// pair — an HRQ document or an anchor's (owner, child) — encoded as
/// `"container/item"`; see [`split_pair`].
#[derive(Clone, Debug)]
pub struct ReconcileRequest {
    pub kind: ReconcilerKind,
    pub namespace: String,
}

/// Splits a `"container/item"` compound reconcile key. Namespace and
/// document names may not themselves contain `/`, matching the
/// orchestration platform's own naming rules.
pub fn split_pair(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
}

pub fn join_pair(container: &str, item: &str) -> String {
    format!("{container}/{item}")
}

/// A bounded fan-out channel. `spec.md` §9 calls for sizing the channel "so
/// that the normal one-write-to-N-affected fan-out does not block a lock
/// holder" — sends always happen from a spawned task, never from the lock
/// holder itself, so a full channel only ever backs up the dispatch task,
/// never the reconciler that produced the enqueue list.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<ReconcileRequest>,
}

pub struct EventBusReceiver {
    pub rx: mpsc::Receiver<ReconcileRequest>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, EventBusReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, EventBusReceiver { rx })
    }

    /// Enqueues `kind` reconciles for every namespace in `names`, dispatched
    /// from a background task so the caller (typically still logically
    /// "under the lock" in spirit, even though the lock itself has already
    /// been released by the time this runs) never blocks on channel
    /// capacity.
    pub fn enqueue_many(&self, kind: ReconcilerKind, names: impl IntoIterator<Item = String>) {
        let tx = self.tx.clone();
        let requests: Vec<ReconcileRequest> =
            names.into_iter().map(|namespace| ReconcileRequest { kind, namespace }).collect();
        if requests.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for req in requests {
                if tx.send(req).await.is_err() {
                    break;
                }
            }
        });
    }

    pub fn enqueue(&self, kind: ReconcilerKind, namespace: impl Into<String>) {
        self.enqueue_many(kind, [namespace.into()]);
    }
}

/// Shared handle type reconcilers hold onto; an `Arc<EventBus>` would also
/// work, but the bus is already cheaply `Clone` (an `mpsc::Sender` clone),
/// so callers are free to pick whichever is more convenient.
pub type SharedEventBus = Arc<EventBus>;
