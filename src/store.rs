//! Persisted-document types and the `ObjectStore` boundary to the
//! orchestration platform's API server (`spec.md` §1, §6).
//!
//! `spec.md` §1 explicitly places "the orchestration platform's API
//! server, object store" outside this crate's scope; `ObjectStore` is the
//! trait a host binary implements to bridge the two. Grounded on
//! `spark-core::transport::traits` split between a generic (static
//! dispatch) and object-safe (dynamic dispatch) trait pair — here a single
//! `async_trait` suffices since every reconciler already needs dynamic
//! dispatch to support test doubles.

use crate::model::{AnchorState, Condition, Gvk, Manager, PropagationMode, ResourceList, Selector};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The hierarchy singleton document (`spec.md` §6 table, row 1).
#[derive(Clone, Debug, Default)]
pub struct HierarchyDoc {
    pub spec_parent: Option<String>,
    pub allow_cascading_deletion: bool,
    pub managed_labels: BTreeMap<String, String>,
    pub managed_annotations: BTreeMap<String, String>,
    pub status_children: Vec<String>,
    pub status_conditions: Vec<Condition>,
    pub finalized: bool,
}

/// A subnamespace anchor document, living in the parent namespace and
/// named after the child it declares ownership of.
#[derive(Clone, Debug)]
pub struct AnchorDoc {
    pub owner_namespace: String,
    pub child_name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub status: AnchorState,
}

/// One entry of the cluster-scoped HNC configuration document.
#[derive(Clone, Debug)]
pub struct KindConfigEntry {
    pub gvk: Gvk,
    pub mode: PropagationMode,
}

#[derive(Clone, Debug, Default)]
pub struct HncConfigDoc {
    pub kinds: Vec<KindConfigEntry>,
    pub excluded_namespaces: Vec<String>,
}

/// A `HierarchicalResourceQuota` document.
#[derive(Clone, Debug)]
pub struct HrqDoc {
    pub namespace: String,
    pub name: String,
    pub hard: ResourceList,
    pub status_hard: ResourceList,
    pub status_used: ResourceList,
    pub status_request_summary: String,
    pub status_limit_summary: String,
}

/// The namespace object itself (existence + the subset of metadata HNC
/// reads/writes: the manager annotation and its own managed labels).
#[derive(Clone, Debug)]
pub struct NamespaceObj {
    pub name: String,
    pub manager: Manager,
    pub labels: BTreeMap<String, String>,
    pub deletion_timestamp_set: bool,
}

/// A namespace-scoped object of a propagated kind, source or copy.
#[derive(Clone, Debug, PartialEq)]
pub struct PropagatedObjectDoc {
    pub gvk: Gvk,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub finalizers: Vec<String>,
    pub inherited_from: Option<String>,
    pub resource_version: String,
    /// A simplified stand-in for the object's full canonical body (the
    /// platform's actual object schema is out of scope per `spec.md` §1);
    /// equality of this map is what the object validator and propagator
    /// use to decide whether a propagated copy's content still matches its
    /// source.
    pub body: BTreeMap<String, String>,
    pub selector: Option<Selector>,
    pub is_service_account_token: bool,
}

/// The per-namespace resource-quota singleton the platform's own admission
/// controller watches (`spec.md` §4.4.2, §4.4.3).
#[derive(Clone, Debug, Default)]
pub struct RqSingletonDoc {
    pub namespace: String,
    pub spec_hard: ResourceList,
    pub status_used: ResourceList,
    /// Carries a `cleanup`-style label and a non-propagate annotation so the
    /// singleton itself is never mistaken for an inherited propagated object
    /// (`spec.md` §4.4.2).
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// The boundary to the orchestration platform's object store. A host binary
/// implements this against the platform's real API; reconcilers in this
/// crate only ever call through it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_namespace(&self, name: &str) -> crate::error::Result<Option<NamespaceObj>>;
    async fn put_namespace(&self, obj: NamespaceObj) -> crate::error::Result<()>;
    async fn delete_namespace(&self, name: &str) -> crate::error::Result<()>;

    async fn get_hierarchy(&self, namespace: &str) -> crate::error::Result<Option<HierarchyDoc>>;
    async fn put_hierarchy(&self, namespace: &str, doc: HierarchyDoc) -> crate::error::Result<()>;

    async fn get_anchor_for_child(&self, parent: &str, child: &str) -> crate::error::Result<Option<AnchorDoc>>;
    /// Finds the anchor (in any namespace) declaring ownership of `child`,
    /// used by the hierarchy reconciler before `child`'s parent is known
    /// (`spec.md` §4.2 step 3).
    async fn find_anchor_for_child(&self, child: &str) -> crate::error::Result<Option<AnchorDoc>>;
    async fn list_anchors(&self, parent: &str) -> crate::error::Result<Vec<AnchorDoc>>;
    async fn put_anchor(&self, anchor: AnchorDoc) -> crate::error::Result<()>;
    async fn delete_anchor(&self, parent: &str, child: &str) -> crate::error::Result<()>;

    async fn get_hnc_config(&self) -> crate::error::Result<HncConfigDoc>;
    async fn put_hnc_config(&self, doc: HncConfigDoc) -> crate::error::Result<()>;

    async fn get_hrq(&self, namespace: &str, name: &str) -> crate::error::Result<Option<HrqDoc>>;
    async fn list_hrqs(&self, namespace: &str) -> crate::error::Result<Vec<HrqDoc>>;
    async fn put_hrq(&self, doc: HrqDoc) -> crate::error::Result<()>;

    async fn get_rq_singleton(&self, namespace: &str) -> crate::error::Result<Option<RqSingletonDoc>>;
    async fn put_rq_singleton(&self, doc: RqSingletonDoc) -> crate::error::Result<()>;
    async fn delete_rq_singleton(&self, namespace: &str) -> crate::error::Result<()>;

    async fn get_object(&self, gvk: &Gvk, namespace: &str, name: &str) -> crate::error::Result<Option<PropagatedObjectDoc>>;
    async fn list_objects(&self, gvk: &Gvk, namespace: &str) -> crate::error::Result<Vec<PropagatedObjectDoc>>;
    async fn put_object(&self, obj: PropagatedObjectDoc) -> crate::error::Result<()>;
    async fn delete_object(&self, gvk: &Gvk, namespace: &str, name: &str) -> crate::error::Result<()>;
}
