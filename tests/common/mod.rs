//! Shared test doubles for the integration suite, grounded on the teacher's
//! `test_stubs` module: one canonical fake per contract instead of letting
//! every test file hand-roll its own.

use async_trait::async_trait;
use hnc_core::admission::{AuthorizationCheck, Authorizer};
use hnc_core::error::Result;
use hnc_core::store::{AnchorDoc, HierarchyDoc, HncConfigDoc, HrqDoc, NamespaceObj, ObjectStore, PropagatedObjectDoc, RqSingletonDoc};
use hnc_core::model::Gvk;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory stand-in for the orchestration platform's object store.
#[derive(Default)]
pub struct FakeStore {
    namespaces: Mutex<BTreeMap<String, NamespaceObj>>,
    hierarchies: Mutex<BTreeMap<String, HierarchyDoc>>,
    anchors: Mutex<BTreeMap<(String, String), AnchorDoc>>,
    hnc_config: Mutex<HncConfigDoc>,
    hrqs: Mutex<BTreeMap<(String, String), HrqDoc>>,
    rq_singletons: Mutex<BTreeMap<String, RqSingletonDoc>>,
    objects: Mutex<BTreeMap<(Gvk, String, String), PropagatedObjectDoc>>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_namespace(&self, name: &str) -> Result<Option<NamespaceObj>> {
        Ok(self.namespaces.lock().unwrap().get(name).cloned())
    }

    async fn put_namespace(&self, obj: NamespaceObj) -> Result<()> {
        self.namespaces.lock().unwrap().insert(obj.name.clone(), obj);
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.namespaces.lock().unwrap().remove(name);
        Ok(())
    }

    async fn get_hierarchy(&self, namespace: &str) -> Result<Option<HierarchyDoc>> {
        Ok(self.hierarchies.lock().unwrap().get(namespace).cloned())
    }

    async fn put_hierarchy(&self, namespace: &str, doc: HierarchyDoc) -> Result<()> {
        self.hierarchies.lock().unwrap().insert(namespace.to_string(), doc);
        Ok(())
    }

    async fn get_anchor_for_child(&self, parent: &str, child: &str) -> Result<Option<AnchorDoc>> {
        Ok(self.anchors.lock().unwrap().get(&(parent.to_string(), child.to_string())).cloned())
    }

    async fn find_anchor_for_child(&self, child: &str) -> Result<Option<AnchorDoc>> {
        Ok(self.anchors.lock().unwrap().values().find(|a| a.child_name == child).cloned())
    }

    async fn list_anchors(&self, parent: &str) -> Result<Vec<AnchorDoc>> {
        Ok(self.anchors.lock().unwrap().values().filter(|a| a.owner_namespace == parent).cloned().collect())
    }

    async fn put_anchor(&self, anchor: AnchorDoc) -> Result<()> {
        self.anchors.lock().unwrap().insert((anchor.owner_namespace.clone(), anchor.child_name.clone()), anchor);
        Ok(())
    }

    async fn delete_anchor(&self, parent: &str, child: &str) -> Result<()> {
        self.anchors.lock().unwrap().remove(&(parent.to_string(), child.to_string()));
        Ok(())
    }

    async fn get_hnc_config(&self) -> Result<HncConfigDoc> {
        Ok(self.hnc_config.lock().unwrap().clone())
    }

    async fn put_hnc_config(&self, doc: HncConfigDoc) -> Result<()> {
        *self.hnc_config.lock().unwrap() = doc;
        Ok(())
    }

    async fn get_hrq(&self, namespace: &str, name: &str) -> Result<Option<HrqDoc>> {
        Ok(self.hrqs.lock().unwrap().get(&(namespace.to_string(), name.to_string())).cloned())
    }

    async fn list_hrqs(&self, namespace: &str) -> Result<Vec<HrqDoc>> {
        Ok(self.hrqs.lock().unwrap().values().filter(|d| d.namespace == namespace).cloned().collect())
    }

    async fn put_hrq(&self, doc: HrqDoc) -> Result<()> {
        self.hrqs.lock().unwrap().insert((doc.namespace.clone(), doc.name.clone()), doc);
        Ok(())
    }

    async fn get_rq_singleton(&self, namespace: &str) -> Result<Option<RqSingletonDoc>> {
        Ok(self.rq_singletons.lock().unwrap().get(namespace).cloned())
    }

    async fn put_rq_singleton(&self, doc: RqSingletonDoc) -> Result<()> {
        self.rq_singletons.lock().unwrap().insert(doc.namespace.clone(), doc);
        Ok(())
    }

    async fn delete_rq_singleton(&self, namespace: &str) -> Result<()> {
        self.rq_singletons.lock().unwrap().remove(namespace);
        Ok(())
    }

    async fn get_object(&self, gvk: &Gvk, namespace: &str, name: &str) -> Result<Option<PropagatedObjectDoc>> {
        Ok(self.objects.lock().unwrap().get(&(gvk.clone(), namespace.to_string(), name.to_string())).cloned())
    }

    async fn list_objects(&self, gvk: &Gvk, namespace: &str) -> Result<Vec<PropagatedObjectDoc>> {
        Ok(self.objects.lock().unwrap().values().filter(|o| &o.gvk == gvk && o.namespace == namespace).cloned().collect())
    }

    async fn put_object(&self, obj: PropagatedObjectDoc) -> Result<()> {
        self.objects.lock().unwrap().insert((obj.gvk.clone(), obj.namespace.clone(), obj.name.clone()), obj);
        Ok(())
    }

    async fn delete_object(&self, gvk: &Gvk, namespace: &str, name: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(&(gvk.clone(), namespace.to_string(), name.to_string()));
        Ok(())
    }
}

/// Grants every authorization check unconditionally; real RBAC evaluation
/// is an external collaborator (`spec.md` §1).
pub struct AlwaysAuthorize;

#[async_trait]
impl Authorizer for AlwaysAuthorize {
    async fn check(&self, _caller: &str, _check: &AuthorizationCheck) -> bool {
        true
    }
}
