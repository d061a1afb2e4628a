//! `ConfigurationReconciler` (`SPEC_FULL.md` §4.7): duplicate-entry
//! deduplication and the full re-sweep triggered by a mode change.

mod common;

use common::FakeStore;
use hnc_core::config::KindRegistry;
use hnc_core::events::{EventBus, ReconcilerKind};
use hnc_core::forest::Forest;
use hnc_core::model::{Gvk, PropagationMode};
use hnc_core::observability::NoopFacade;
use hnc_core::reconcile::ConfigurationReconciler;
use hnc_core::store::{HncConfigDoc, KindConfigEntry, ObjectStore};
use std::sync::Arc;

#[tokio::test]
async fn duplicate_kind_entries_are_dropped_and_mode_change_resweeps() {
    let forest = Forest::new();
    let store = Arc::new(FakeStore::default());
    let (events, mut rx) = EventBus::new(16);
    let events = Arc::new(events);
    let kinds = Arc::new(KindRegistry::new());
    let obs = Arc::new(NoopFacade);

    let secret = Gvk::new("", "v1", "Secret");
    store
        .put_hnc_config(HncConfigDoc {
            kinds: vec![
                KindConfigEntry { gvk: secret.clone(), mode: PropagationMode::Propagate },
                KindConfigEntry { gvk: secret.clone(), mode: PropagationMode::Remove },
            ],
            excluded_namespaces: vec![],
        })
        .await
        .unwrap();

    forest.with_lock(|g| {
        g.get_mut("a").exists = true;
    });

    let reconciler = ConfigurationReconciler::new(store.clone(), forest.clone(), events.clone(), kinds.clone(), obs.clone());
    reconciler.reconcile().await.unwrap();

    let doc = store.get_hnc_config().await.unwrap();
    assert_eq!(doc.kinds.len(), 1, "duplicate entry for the same GVK must be dropped");
    assert_eq!(doc.kinds[0].mode, PropagationMode::Propagate, "the first entry wins over the later duplicate");
    assert_eq!(kinds.mode(&secret), PropagationMode::Propagate);

    let request = rx.rx.recv().await.expect("mode change must resweep every namespace");
    assert!(matches!(request.kind, ReconcilerKind::Hierarchy));
    assert_eq!(request.namespace, "a");
}
