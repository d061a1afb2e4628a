//! `Controller` (`spec.md` §6 CLI surface, `ReconcileDriver::dispatch`
//! routing): exercises the facade end to end against `FakeStore`, including
//! the compound `owner/child` anchor key and the cascading-deletion CLI
//! path this review's comment 2 fix covers.

mod common;

use common::{AlwaysAuthorize, FakeStore};
use hnc_core::config::{ConfigSnapshot, StaticConfigSource};
use hnc_core::controller::{Controller, ReconcileDriver};
use hnc_core::events::{join_pair, EventBusReceiver, ReconcileRequest, ReconcilerKind};
use hnc_core::model::Manager;
use hnc_core::observability::NoopFacade;
use hnc_core::store::{NamespaceObj, ObjectStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn namespace(name: &str) -> NamespaceObj {
    NamespaceObj { name: name.to_string(), manager: Manager::Internal, labels: BTreeMap::new(), deletion_timestamp_set: false }
}

async fn recv_until(receiver: &mut EventBusReceiver, kind: ReconcilerKind, namespace: &str) -> ReconcileRequest {
    loop {
        let req = receiver.rx.recv().await.expect("channel closed while waiting for a request");
        if req.kind == kind && req.namespace == namespace {
            return req;
        }
    }
}

fn new_controller(store: Arc<FakeStore>) -> (Arc<Controller>, EventBusReceiver) {
    let config = Arc::new(StaticConfigSource(ConfigSnapshot::default()));
    let authorizer = Arc::new(AlwaysAuthorize);
    let obs = Arc::new(NoopFacade);
    Controller::new(store, config, authorizer, obs, 32, Duration::from_secs(3600))
}

#[tokio::test]
async fn set_parent_then_dispatch_updates_the_hierarchy_document() {
    let store = Arc::new(FakeStore::default());
    store.put_namespace(namespace("a")).await.unwrap();
    store.put_namespace(namespace("b")).await.unwrap();
    let (controller, mut receiver) = new_controller(store.clone());

    controller.set_parent("b", Some("a".to_string())).await.unwrap();
    let req = recv_until(&mut receiver, ReconcilerKind::Hierarchy, "b").await;
    controller.dispatch(req).await.unwrap();

    let doc = store.get_hierarchy("b").await.unwrap().unwrap();
    assert_eq!(doc.spec_parent, Some("a".to_string()));

    let description = controller.describe_hierarchy("b").unwrap();
    assert_eq!(description.parent, Some("a".to_string()));
}

#[tokio::test]
async fn create_subnamespace_dispatch_creates_the_child_namespace() {
    let store = Arc::new(FakeStore::default());
    store.put_namespace(namespace("owner")).await.unwrap();
    let (controller, mut receiver) = new_controller(store.clone());

    controller.create_subnamespace("owner", "child", BTreeMap::new(), BTreeMap::new()).await.unwrap();
    let req = recv_until(&mut receiver, ReconcilerKind::Anchor, &join_pair("owner", "child")).await;
    controller.dispatch(req).await.unwrap();

    assert!(store.get_namespace("child").await.unwrap().is_some());
}

#[tokio::test]
async fn cascading_deletion_through_the_full_cli_and_dispatch_path() {
    let store = Arc::new(FakeStore::default());
    store.put_namespace(namespace("owner")).await.unwrap();
    let (controller, mut receiver) = new_controller(store.clone());

    controller.create_subnamespace("owner", "child", BTreeMap::new(), BTreeMap::new()).await.unwrap();
    let req = recv_until(&mut receiver, ReconcilerKind::Anchor, &join_pair("owner", "child")).await;
    controller.dispatch(req).await.unwrap();
    assert!(store.get_namespace("child").await.unwrap().is_some());

    // Let the hierarchy reconciler observe the new child so the forest
    // records it as owned by "owner" before the deletion path checks it.
    let req = recv_until(&mut receiver, ReconcilerKind::Hierarchy, "child").await;
    controller.dispatch(req).await.unwrap();

    controller.mark_cascading_deletion("owner", true).await.unwrap();
    let req = recv_until(&mut receiver, ReconcilerKind::Hierarchy, "owner").await;
    controller.dispatch(req).await.unwrap();

    controller.delete_subnamespace("owner", "child").await.unwrap();
    let req = recv_until(&mut receiver, ReconcilerKind::Anchor, &join_pair("owner", "child")).await;
    controller.dispatch(req).await.unwrap();

    assert!(store.get_namespace("child").await.unwrap().is_none(), "cascading deletion was enabled, child must be gone");
}

#[tokio::test]
async fn hnc_configuration_dispatch_routes_through_reconcile_config() {
    let store = Arc::new(FakeStore::default());
    let (controller, mut receiver) = new_controller(store.clone());

    let secret = hnc_core::model::Gvk::new("", "v1", "Secret");
    controller
        .configure_propagated_kinds(
            vec![hnc_core::store::KindConfigEntry { gvk: secret, mode: hnc_core::model::PropagationMode::Propagate }],
            vec![],
        )
        .await
        .unwrap();
    let req = recv_until(&mut receiver, ReconcilerKind::HncConfiguration, "").await;
    controller.dispatch(req).await.unwrap();

    let doc = store.get_hnc_config().await.unwrap();
    assert_eq!(doc.kinds.len(), 1);
}
