//! The `Namespace` node shape (`spec.md` §3).

use crate::model::{Condition, Manager, ObjectKey, Quantity, ResourceList};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-namespace quota state: locally-declared limits, local usage, and
/// aggregated subtree usage (`spec.md` §3, `quotas.*` fields).
#[derive(Clone, Debug, Default)]
pub struct NamespaceQuota {
    /// `hrqName -> hard limits declared by that HRQ document in this namespace`.
    pub limits: BTreeMap<String, ResourceList>,
    /// Usage observed locally, filtered to resources limited *at this
    /// namespace* (S3: a namespace with no HRQ on a resource does not track
    /// it locally even if it consumes it).
    pub used_local: ResourceList,
    /// Aggregated usage across this namespace and all descendants.
    pub used_subtree: ResourceList,
    /// The last unfiltered usage observed from the platform, kept only to
    /// compute deltas correctly across calls to `use_resources` — the
    /// *exposed* `used_local` above is filtered and would otherwise lose
    /// the information needed to roll a child's unlimited-locally resource
    /// up into a limiting ancestor's subtree total.
    pub(crate) used_local_raw: ResourceList,
}

impl NamespaceQuota {
    /// I7: the effective per-namespace limit for each resource is the `min`
    /// across every HRQ limit declared at this namespace.
    pub fn own_effective_limits(&self) -> ResourceList {
        let mut out: ResourceList = BTreeMap::new();
        for hard in self.limits.values() {
            for (name, qty) in hard {
                out.entry(name.clone())
                    .and_modify(|existing| *existing = (*existing).min(*qty))
                    .or_insert(*qty);
            }
        }
        out
    }
}

/// One known namespace name. Created lazily (`spec.md` §4.1: "Lookups
/// auto-create empty Namespace nodes") and never destroyed while referenced
/// by any other node or by the caller.
#[derive(Clone, Debug)]
pub struct NamespaceNode {
    pub name: String,
    pub exists: bool,
    /// Parent is stored as a *name*, not a direct reference, so that a
    /// transient cycle never produces a reference cycle in the host
    /// language's memory model (`spec.md` §9, "Cyclic ownership").
    pub parent: Option<String>,
    pub children: HashSet<String>,
    pub is_sub: bool,
    pub manager: Manager,
    pub anchors: HashSet<String>,
    pub allow_cascading_deletion: bool,
    pub managed_labels: BTreeMap<String, String>,
    pub managed_annotations: BTreeMap<String, String>,
    /// `<ancestor-name>.tree.<group>/depth -> integer`, depth 0 at self.
    pub tree_labels: BTreeMap<String, u32>,
    pub conditions: Vec<Condition>,
    pub source_objects: HashMap<ObjectKey, SourceObject>,
    pub quotas: NamespaceQuota,
}

impl NamespaceNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exists: false,
            parent: None,
            children: HashSet::new(),
            is_sub: false,
            manager: Manager::Internal,
            anchors: HashSet::new(),
            allow_cascading_deletion: false,
            managed_labels: BTreeMap::new(),
            managed_annotations: BTreeMap::new(),
            tree_labels: BTreeMap::new(),
            conditions: Vec::new(),
            source_objects: HashMap::new(),
            quotas: NamespaceQuota::default(),
        }
    }

    pub fn has_condition(&self, ty: &crate::model::ConditionType) -> bool {
        self.conditions.iter().any(|c| &c.ty == ty)
    }

    pub fn is_halted(&self) -> bool {
        self.has_condition(&crate::model::ConditionType::ActivitiesHalted)
    }
}

/// A source object recorded by the forest: enough metadata for the
/// propagator (`spec.md` §4.3) to decide ancestry precedence and for the
/// object validator (§4.6) to detect name collisions across descendants.
#[derive(Clone, Debug)]
pub struct SourceObject {
    pub propagatable: bool,
    /// `None` unless the object's selector annotations restrict which
    /// descendants it propagates into.
    pub selector: Option<Selector>,
}

/// The three selector annotation forms `spec.md` §4.3 allows, of which at
/// most one may be present on a source object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Label(BTreeMap<String, String>),
    Tree(String),
    None,
}
