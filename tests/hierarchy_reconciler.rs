//! `HierarchyReconciler` (`spec.md` §4.2): parent-anchor adoption and
//! tree-depth label propagation, plus the `DeletingCRD` condition wiring
//! (`spec.md` §4.2 step 4, `spec.md` §7).

mod common;

use common::FakeStore;
use hnc_core::config::{ConfigSnapshot, KindRegistry, StaticConfigSource};
use hnc_core::events::EventBus;
use hnc_core::forest::Forest;
use hnc_core::model::{ConditionReason, Manager};
use hnc_core::observability::NoopFacade;
use hnc_core::reconcile::HierarchyReconciler;
use hnc_core::store::{NamespaceObj, ObjectStore};
use std::sync::Arc;

fn namespace(name: &str) -> NamespaceObj {
    NamespaceObj { name: name.to_string(), manager: Manager::Internal, labels: Default::default(), deletion_timestamp_set: false }
}

#[tokio::test]
async fn parent_anchor_is_adopted_and_tree_label_written() {
    let forest = Forest::new();
    let store = Arc::new(FakeStore::default());
    let (events, _rx) = EventBus::new(16);
    let events = Arc::new(events);
    let config = Arc::new(StaticConfigSource(ConfigSnapshot::default()));
    let kinds = Arc::new(KindRegistry::new());
    let obs = Arc::new(NoopFacade);

    store.put_namespace(namespace("a")).await.unwrap();
    store.put_namespace(namespace("b")).await.unwrap();
    store
        .put_anchor(hnc_core::store::AnchorDoc {
            owner_namespace: "a".to_string(),
            child_name: "b".to_string(),
            labels: Default::default(),
            annotations: Default::default(),
            status: hnc_core::model::AnchorState::Missing,
        })
        .await
        .unwrap();

    let reconciler = HierarchyReconciler::new(store.clone(), forest.clone(), events.clone(), config.clone(), kinds.clone(), obs.clone());
    reconciler.reconcile("a").await.unwrap();
    reconciler.reconcile("b").await.unwrap();

    let b_doc = store.get_hierarchy("b").await.unwrap().unwrap();
    assert_eq!(b_doc.spec_parent, Some("a".to_string()));

    let b_ns = store.get_namespace("b").await.unwrap().unwrap();
    assert_eq!(b_ns.labels.get("a.tree.hnc.example.io/depth"), Some(&"1".to_string()));
}

#[tokio::test]
async fn deleting_crd_condition_is_added_and_cleared() {
    let forest = Forest::new();
    let store = Arc::new(FakeStore::default());
    let (events, _rx) = EventBus::new(16);
    let events = Arc::new(events);
    let kinds = Arc::new(KindRegistry::new());
    let obs = Arc::new(NoopFacade);

    store.put_namespace(namespace("a")).await.unwrap();

    let removing = Arc::new(StaticConfigSource(ConfigSnapshot { hierarchy_kind_removing: true, ..ConfigSnapshot::default() }));
    let reconciler = HierarchyReconciler::new(store.clone(), forest.clone(), events.clone(), removing, kinds.clone(), obs.clone());
    reconciler.reconcile("a").await.unwrap();

    let doc = store.get_hierarchy("a").await.unwrap().unwrap();
    assert!(doc.status_conditions.iter().any(|c| c.reason == ConditionReason::DeletingCrd), "{:?}", doc.status_conditions);

    let not_removing = Arc::new(StaticConfigSource(ConfigSnapshot::default()));
    let reconciler = HierarchyReconciler::new(store.clone(), forest.clone(), events.clone(), not_removing, kinds.clone(), obs.clone());
    reconciler.reconcile("a").await.unwrap();

    let doc = store.get_hierarchy("a").await.unwrap().unwrap();
    assert!(!doc.status_conditions.iter().any(|c| c.reason == ConditionReason::DeletingCrd), "{:?}", doc.status_conditions);
}
