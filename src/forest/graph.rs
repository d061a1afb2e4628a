//! The Forest: the single authoritative, mutable, lock-protected graph of
//! namespaces (`spec.md` §3, §4.1, §9 "Global shared state").
//!
//! Every operation that reads *or* writes forest state holds `Forest`'s one
//! [`parking_lot::Mutex`] for its entire duration; no blocking I/O happens
//! while it is held (`spec.md` §4.1, §5). Reconcilers call a `Forest`
//! method, get back a mutation result plus an `AffectedSet` to enqueue, and
//! only then release the lock and perform I/O — grounded on the
//! lock-then-compute-then-release shape of `spark-core`'s pipeline
//! controller, adapted here to a single coarse lock instead of a
//! per-channel one since the working set (thousands of namespaces) fits
//! comfortably in memory (`spec.md` §9).

use super::namespace::{NamespaceNode, Selector, SourceObject};
use crate::model::{add, filter_to, sub, Condition, ConditionReason, ObjectKey, ResourceList};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// The set of namespace names a mutation affects and that must therefore be
/// re-enqueued onto the relevant reconcilers once the forest lock is
/// released (`spec.md` §4.1, §9 "Event fan-out").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AffectedSet(pub HashSet<String>);

impl AffectedSet {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    pub fn insert(&mut self, name: impl Into<String>) -> &mut Self {
        self.0.insert(name.into());
        self
    }

    pub fn extend(&mut self, names: impl IntoIterator<Item = String>) -> &mut Self {
        self.0.extend(names);
        self
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

struct ForestInner {
    nodes: HashMap<String, NamespaceNode>,
}

impl ForestInner {
    fn ensure(&mut self, name: &str) -> &mut NamespaceNode {
        self.nodes.entry(name.to_string()).or_insert_with(|| NamespaceNode::new(name))
    }
}

/// The shared, lock-protected namespace graph.
#[derive(Clone)]
pub struct Forest {
    inner: Arc<Mutex<ForestInner>>,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(ForestInner { nodes: HashMap::new() })) }
    }

    /// Runs `f` with exclusive access to the forest. This is the *only*
    /// entry point into forest state; every reconciler and admission
    /// handler goes through it so that the "one coarse lock" contract in
    /// `spec.md` §4.1/§5 cannot be bypassed by accident.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut ForestGuard<'_>) -> R) -> R {
        let mut guard = self.inner.lock();
        let mut scoped = ForestGuard { inner: &mut guard };
        f(&mut scoped)
    }
}

/// A scoped handle to the forest held only while the lock is held. All
/// graph primitives from `spec.md` §4.1 live here.
pub struct ForestGuard<'a> {
    inner: &'a mut ForestInner,
}

impl<'a> ForestGuard<'a> {
    /// `get(name)` — auto-creates an empty node on first reference.
    pub fn get(&mut self, name: &str) -> &NamespaceNode {
        self.inner.ensure(name)
    }

    pub fn get_mut(&mut self, name: &str) -> &mut NamespaceNode {
        self.inner.ensure(name)
    }

    pub fn try_get(&self, name: &str) -> Option<&NamespaceNode> {
        self.inner.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.nodes.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.nodes.keys().cloned().collect()
    }

    /// root-first ancestry including `n`; stops at a cycle or a missing
    /// parent (I5: a namespace on a cycle is treated as having no parent
    /// for ancestry purposes).
    pub fn ancestry(&self, n: &str) -> Vec<String> {
        let cycle: HashSet<&str> = self.cycle_names(n).into_iter().collect();
        let mut chain = Vec::new();
        let mut cur = Some(n.to_string());
        let mut seen = HashSet::new();
        while let Some(name) = cur {
            if !seen.insert(name.clone()) {
                break;
            }
            if name != n && cycle.contains(name.as_str()) {
                break;
            }
            chain.push(name.clone());
            cur = self.inner.nodes.get(&name).and_then(|node| {
                if cycle.contains(node.name.as_str()) && node.name != n {
                    None
                } else {
                    node.parent.clone()
                }
            });
        }
        chain.reverse();
        chain
    }

    /// All nodes whose ancestry contains `n` (excluding `n` itself is not
    /// implied by `spec.md`'s definition — it returns descendants proper,
    /// `n` excluded, matching "this namespace and all descendants" being
    /// spelled out separately wherever both are needed).
    pub fn descendants(&self, n: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<String> = self
            .inner
            .nodes
            .get(n)
            .map(|node| node.children.iter().cloned().collect())
            .unwrap_or_default();
        let mut seen = HashSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            out.push(name.clone());
            if let Some(node) = self.inner.nodes.get(&name) {
                stack.extend(node.children.iter().cloned());
            }
        }
        out
    }

    /// Members of the cycle `n` participates in, in order, or empty if `n`
    /// is not on a cycle.
    pub fn cycle_names(&self, n: &str) -> Vec<String> {
        let mut chain = vec![n.to_string()];
        let mut seen: HashMap<String, usize> = HashMap::new();
        seen.insert(n.to_string(), 0);
        let mut cur = self.inner.nodes.get(n).and_then(|node| node.parent.clone());
        while let Some(name) = cur {
            if let Some(&idx) = seen.get(&name) {
                return chain[idx..].to_vec();
            }
            seen.insert(name.clone(), chain.len());
            chain.push(name.clone());
            cur = self.inner.nodes.get(&name).and_then(|node| node.parent.clone());
        }
        Vec::new()
    }

    /// ancestors ∪ descendants ∪ {n}.
    pub fn relative_names(&self, n: &str) -> HashSet<String> {
        let mut out: HashSet<String> = self.ancestry(n).into_iter().collect();
        out.extend(self.descendants(n));
        out.insert(n.to_string());
        out
    }

    /// Rejects self-cycles, rejects creating a new cycle, rejects
    /// external+parent combinations (I3).
    pub fn can_set_parent(&self, n: &str, p: Option<&str>) -> Result<(), String> {
        let Some(p) = p else { return Ok(()) };
        if p == n {
            return Err(format!("{n} cannot be its own parent"));
        }
        if let Some(node) = self.inner.nodes.get(n) {
            if !node.manager.is_internal() {
                return Err(format!("{n} is externally managed and may not have a parent"));
            }
        }
        // Would `p` become a descendant of `n`, i.e. does `n` appear in
        // `p`'s ancestry (ignoring cycles `p` is already on)?
        if self.ancestry(p).iter().any(|a| a == n) {
            return Err(format!("setting {n}'s parent to {p} would create a cycle"));
        }
        Ok(())
    }

    /// Sets `n`'s parent to `p`, returning the set of namespaces whose
    /// derived state (tree labels, ancestor conditions) may now be stale:
    /// old parent, new parent, all of `n`'s descendants, and any former
    /// cycle members (`spec.md` §4.2 step 4).
    pub fn set_parent(&mut self, n: &str, p: Option<&str>) -> AffectedSet {
        let mut affected = AffectedSet::new();
        let former_cycle = self.cycle_names(n);
        let old_parent = self.get_mut(n).parent.clone();
        if old_parent.as_deref() == p {
            return affected;
        }
        if let Some(old) = &old_parent {
            self.inner.ensure(old).children.remove(n);
            affected.insert(old.clone());
        }
        self.get_mut(n).parent = p.map(|s| s.to_string());
        if let Some(new_parent) = p {
            self.inner.ensure(new_parent).children.insert(n.to_string());
            affected.insert(new_parent.to_string());
        }
        affected.extend(self.descendants(n));
        affected.extend(former_cycle);
        affected.insert(n.to_string());
        self.recompute_tree_labels(n);
        // I6 must hold after every reconcile, not only after the periodic
        // drift sweep: a re-parent changes which ancestors' subtree totals
        // n's usage rolls into, so recompute both affected trees' subtree
        // usage immediately (S4).
        let mut roots = HashSet::new();
        if let Some(old) = &old_parent {
            roots.insert(self.ancestry(old).first().cloned().unwrap_or_else(|| old.clone()));
        }
        if let Some(new_parent) = p {
            roots.insert(self.ancestry(new_parent).first().cloned().unwrap_or_else(|| new_parent.to_string()));
        }
        roots.insert(self.ancestry(n).first().cloned().unwrap_or_else(|| n.to_string()));
        for root in roots {
            affected.0.extend(self.recompute_subtree_drift(&root).0);
        }
        affected
    }

    /// Recomputes tree-depth labels for `n` and every descendant of `n`
    /// (`spec.md` §4.2 step 4: "Apply ... tree-depth labels for every
    /// ancestor (depth 0 at self, increasing upward), stopping at a halted
    /// ancestor").
    pub fn recompute_tree_labels(&mut self, start: &str) {
        let mut to_visit = vec![start.to_string()];
        to_visit.extend(self.descendants(start));
        for name in to_visit {
            let labels = self.compute_tree_labels_for(&name);
            self.get_mut(&name).tree_labels = labels;
        }
    }

    fn compute_tree_labels_for(&self, n: &str) -> BTreeMap<String, u32> {
        let mut labels = BTreeMap::new();
        labels.insert(n.to_string(), 0);
        let ancestry = self.ancestry(n);
        // ancestry is root-first including n; walk from n backward (depth 1, 2, ...)
        let mut depth = 0u32;
        for name in ancestry.iter().rev().skip(1) {
            if let Some(node) = self.inner.nodes.get(name) {
                if node.is_halted() {
                    break;
                }
            }
            depth += 1;
            labels.insert(name.clone(), depth);
        }
        labels
    }

    /// I4: synthetic `ActivitiesHalted{Ancestor}` condition inheritance.
    pub fn recompute_halted_ancestor(&mut self, n: &str) {
        let ancestry = self.ancestry(n);
        let halted_ancestor = ancestry
            .iter()
            .rev()
            .skip(1)
            .any(|a| self.inner.nodes.get(a).map(|node| node.is_halted()).unwrap_or(false));
        let node = self.get_mut(n);
        node.conditions.retain(|c| c.reason != ConditionReason::Ancestor);
        if halted_ancestor {
            node.conditions.push(Condition::halted(ConditionReason::Ancestor, format!("an ancestor of {n} has halted activities")));
        }
    }

    /// I5: cycle members carry `InCycle` and lose tree labels beyond self.
    pub fn recompute_cycle_condition(&mut self, n: &str) {
        let on_cycle = !self.cycle_names(n).is_empty();
        let node = self.get_mut(n);
        node.conditions.retain(|c| c.reason != ConditionReason::InCycle);
        if on_cycle {
            node.conditions.push(Condition::halted(ConditionReason::InCycle, format!("{n} is on a cycle")));
            node.tree_labels = BTreeMap::from([(n.to_string(), 0)]);
        }
    }

    // ---- quota primitives (spec.md §4.4) ----

    pub fn update_limits(&mut self, n: &str, hrq_name: &str, hard: ResourceList) {
        self.get_mut(n).quotas.limits.insert(hrq_name.to_string(), hard);
    }

    pub fn remove_limits(&mut self, n: &str, hrq_name: &str) {
        self.get_mut(n).quotas.limits.remove(hrq_name);
    }

    /// I7: effective limit for each resource = `min` across every HRQ limit
    /// declared at `n` or any ancestor.
    pub fn effective_limits(&self, n: &str) -> ResourceList {
        let mut out: ResourceList = BTreeMap::new();
        for name in self.ancestry(n) {
            if let Some(node) = self.inner.nodes.get(&name) {
                for (res, qty) in node.quotas.own_effective_limits() {
                    out.entry(res).and_modify(|e| *e = (*e).min(qty)).or_insert(qty);
                }
            }
        }
        out
    }

    /// Applies observed local usage to `n`, then propagates the delta
    /// upward through ancestor `used_subtree`, filtered to currently
    /// limited resources (§4.4.2, §4.4.3 "commit" step). Returns the
    /// ancestry so callers can re-enqueue HRQ statuses.
    pub fn use_resources(&mut self, n: &str, new_local: ResourceList) -> AffectedSet {
        let own_mask = self.get_mut(n).quotas.own_effective_limits();
        let node = self.get_mut(n);
        let old_raw = std::mem::replace(&mut node.quotas.used_local_raw, new_local.clone());
        node.quotas.used_local = filter_to(&new_local, &own_mask);
        // The delta that rolls up to ancestors is computed from the raw
        // (unfiltered) usage: a resource this namespace doesn't itself
        // limit can still be limited by an ancestor, and that ancestor's
        // subtree total must include it (S3).
        let raw_delta = sub(&new_local, &old_raw);
        self.apply_subtree_delta(n, &raw_delta);
        let mut affected = AffectedSet::new();
        affected.extend(self.ancestry(n));
        affected
    }

    /// Adds `delta` (already filtered to resources limited *somewhere* in
    /// the ancestry, per I6) to `n`'s `used_subtree` and every ancestor's.
    fn apply_subtree_delta(&mut self, n: &str, delta: &ResourceList) {
        for name in self.ancestry(n) {
            let ancestry_limit_mask = self.limited_anywhere_in_ancestry(&name);
            let masked = filter_to(delta, &ancestry_limit_mask);
            if masked.is_empty() {
                continue;
            }
            let node = self.get_mut(&name);
            node.quotas.used_subtree = add(&node.quotas.used_subtree, &masked);
        }
    }

    /// The union of resource names limited anywhere in `n`'s ancestry (I6's
    /// filter mask).
    fn limited_anywhere_in_ancestry(&self, n: &str) -> ResourceList {
        let mut mask: ResourceList = BTreeMap::new();
        for name in self.ancestry(n) {
            if let Some(node) = self.inner.nodes.get(&name) {
                for res in node.quotas.own_effective_limits().keys() {
                    mask.entry(res.clone()).or_insert(0);
                }
            }
        }
        mask
    }

    /// I6 drift recomputation: `used_subtree = used_local + Σ
    /// used_subtree(child)`, restricted to limited resource names in the
    /// ancestry. Returns the namespaces whose subtree usage changed.
    pub fn recompute_subtree_drift(&mut self, n: &str) -> AffectedSet {
        let mut affected = AffectedSet::new();
        self.recompute_subtree_drift_inner(n, &mut affected);
        affected
    }

    fn recompute_subtree_drift_inner(&mut self, n: &str, affected: &mut AffectedSet) {
        let children: Vec<String> = self
            .inner
            .nodes
            .get(n)
            .map(|node| node.children.iter().cloned().collect())
            .unwrap_or_default();
        for child in &children {
            self.recompute_subtree_drift_inner(child, affected);
        }
        let mask = self.limited_anywhere_in_ancestry(n);
        let mut total = filter_to(&self.get_mut(n).quotas.used_local_raw.clone(), &mask);
        for child in &children {
            if let Some(child_node) = self.inner.nodes.get(child) {
                total = add(&total, &filter_to(&child_node.quotas.used_subtree, &mask));
            }
        }
        let node = self.get_mut(n);
        if node.quotas.used_subtree != total {
            node.quotas.used_subtree = total;
            affected.insert(n.to_string());
        }
    }

    // ---- propagation primitives (spec.md §4.3, I8) ----

    /// Records `n` as the source namespace for `key` (`spec.md` §3
    /// `sourceObjects[gvk][name]`).
    pub fn set_source(&mut self, n: &str, key: ObjectKey, propagatable: bool, selector: Option<Selector>) {
        self.get_mut(n).source_objects.insert(key, SourceObject { propagatable, selector });
    }

    pub fn clear_source(&mut self, n: &str, key: &ObjectKey) {
        self.get_mut(n).source_objects.remove(key);
    }

    /// Whether `selector` admits `target` as a propagation destination.
    pub fn selector_includes(&self, target: &str, selector: &Selector) -> bool {
        match selector {
            Selector::None => false,
            Selector::Tree(ancestor) => self.ancestry(target).iter().any(|a| a == ancestor),
            Selector::Label(required) => self
                .inner
                .nodes
                .get(target)
                .map(|node| required.iter().all(|(k, v)| node.managed_labels.get(k) == Some(v)))
                .unwrap_or(false),
        }
    }

    /// The root-most ancestor of `n` (excluding `n` itself) holding a
    /// propagatable source for `key` whose selector admits `n` — the
    /// "effective source" of `spec.md` §4.3 step 3. I8 guarantees at most one
    /// candidate exists on a well-formed tree; ties (validator bypassed) are
    /// broken in favor of the namespace closest to the root.
    pub fn effective_source(&self, n: &str, key: &ObjectKey) -> Option<String> {
        let ancestry = self.ancestry(n);
        for name in ancestry.iter().take(ancestry.len().saturating_sub(1)) {
            if let Some(node) = self.inner.nodes.get(name) {
                if let Some(source) = node.source_objects.get(key) {
                    if !source.propagatable {
                        continue;
                    }
                    let included = match &source.selector {
                        None => true,
                        Some(selector) => self.selector_includes(n, selector),
                    };
                    if included {
                        return Some(name.clone());
                    }
                }
            }
        }
        None
    }
}
