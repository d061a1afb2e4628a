//! Shared value types used across the forest, reconcilers and admission
//! handlers: group/version/kind identifiers, resource quantities, and the
//! small enums that show up in more than one module.
//!
//! Grounded on `spark-core::protocol`/`spark-core::router::route` for the
//! "small, `Clone`+`Eq` value type with a stable string identity" shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A group/version/kind triple identifying a propagated object kind.
///
/// `spec.md` §9 calls for "a registry keyed by `(group, version, kind)`".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { group: group.into(), version: version.into(), kind: kind.into() }
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// A reference to a single namespace-scoped object: its kind plus its name
/// within whatever namespace is contextually understood.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub gvk: Gvk,
    pub name: String,
}

/// A simplified resource quantity. The orchestration platform's own
/// quantity type (exponent/suffix aware, e.g. `"500m"`, `"2Gi"`) is treated
/// as an external collaborator's concern (§1); HNC's own logic only ever
/// adds, subtracts, and compares quantities, so an integer scalar in the
/// resource's base unit is sufficient here. See `DESIGN.md` for the
/// corresponding Open Question resolution.
pub type Quantity = i64;

/// A named set of resource quantities, e.g. `{"pods": 3, "secrets": 6}`.
/// `BTreeMap` keeps iteration order deterministic, which `spec.md` §4.4.1
/// relies on for stable alphabetical usage-summary strings.
pub type ResourceList = BTreeMap<String, Quantity>;

/// Filters `list` down to the resource names present in `mask`.
pub fn filter_to(list: &ResourceList, mask: &ResourceList) -> ResourceList {
    list.iter()
        .filter(|(name, _)| mask.contains_key(*name))
        .map(|(name, qty)| (name.clone(), *qty))
        .collect()
}

/// Adds two resource lists, keeping any resource name present in either.
pub fn add(a: &ResourceList, b: &ResourceList) -> ResourceList {
    let mut out = a.clone();
    for (name, qty) in b {
        *out.entry(name.clone()).or_insert(0) += qty;
    }
    out
}

/// Subtracts `b` from `a`, keeping any resource name present in either.
pub fn sub(a: &ResourceList, b: &ResourceList) -> ResourceList {
    let mut out = a.clone();
    for (name, qty) in b {
        *out.entry(name.clone()).or_insert(0) -= qty;
    }
    out
}

/// Strictly-positive entries of `delta`, used by the quota admission hook
/// (`spec.md` §4.4.3) to compute `increases`.
pub fn positive_entries(delta: &ResourceList) -> ResourceList {
    delta.iter().filter(|(_, qty)| **qty > 0).map(|(n, q)| (n.clone(), *q)).collect()
}

/// Who manages a namespace: HNC itself, or an external controller.
/// `spec.md` §3 `manager` field and invariant I3.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Manager {
    Internal,
    External(String),
}

impl Manager {
    pub fn is_internal(&self) -> bool {
        matches!(self, Manager::Internal)
    }
}

/// The three condition reasons `spec.md` calls out explicitly for
/// `ActivitiesHalted`, plus the structural conditions of §7's taxonomy that
/// are surfaced as `BadConfiguration`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    ActivitiesHalted,
    BadConfiguration,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    Ancestor,
    InCycle,
    IllegalParent,
    ParentMissing,
    DeletingCrd,
    IllegalManagedLabel,
    IllegalManagedAnnotation,
    SubnamespaceAnchorMissing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub ty: ConditionType,
    pub reason: ConditionReason,
    pub message: String,
}

impl Condition {
    pub fn halted(reason: ConditionReason, message: impl Into<String>) -> Self {
        Self { ty: ConditionType::ActivitiesHalted, reason, message: message.into() }
    }

    pub fn bad_config(reason: ConditionReason, message: impl Into<String>) -> Self {
        Self { ty: ConditionType::BadConfiguration, reason, message: message.into() }
    }
}

/// Propagation mode for a registered kind (`spec.md` §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagationMode {
    Propagate,
    AllowPropagate,
    Remove,
    Ignore,
}

/// State of a subnamespace anchor (`spec.md` §4.5).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorState {
    Missing,
    Ok,
    Conflict,
    Forbidden,
}

/// Namespace quota status state machine (`spec.md` §4.4, "State machine").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaState {
    NoLimits,
    LimitsEffective,
    OverLimit,
}
