//! Quota admission hook (`spec.md` §4.4.3): intercepts proposed post-
//! consumption usage and speculatively commits it on approval.

use crate::error::{Admission, AdmissionReason};
use crate::forest::Forest;
use crate::model::{positive_entries, sub, ResourceList};

pub struct QuotaAdmissionHook {
    forest: Forest,
}

impl QuotaAdmissionHook {
    pub fn new(forest: Forest) -> Self {
        Self { forest }
    }

    /// Admits (and, on approval, commits) a proposed post-consumption usage
    /// `proposed` for `namespace`. Decreases are always permitted
    /// unconditionally (`spec.md` §4.4.3, §9 "Admission vs. observation
    /// races").
    pub fn admit_and_commit(&self, namespace: &str, proposed: &ResourceList) -> Admission {
        self.forest.with_lock(|g| {
            let current_local = g.get(namespace).quotas.used_local.clone();
            let delta = sub(proposed, &current_local);
            let increases = positive_entries(&delta);

            if !increases.is_empty() {
                let mut violations = Vec::new();
                for ancestor in g.ancestry(namespace) {
                    let Some(node) = g.try_get(&ancestor) else { continue };
                    let limits = node.quotas.own_effective_limits();
                    for (resource, qty) in &increases {
                        if let Some(limit) = limits.get(resource) {
                            let used_now = node.quotas.used_subtree.get(resource).copied().unwrap_or(0);
                            let proposed_total = used_now + qty;
                            if proposed_total > *limit {
                                violations.push(format!("{ancestor}/{resource}: requested {proposed_total}, used {used_now}, limit {limit}"));
                            }
                        }
                    }
                }
                if !violations.is_empty() {
                    return Admission::deny(AdmissionReason::Forbidden, format!("quota exceeded: {}", violations.join("; ")));
                }
            }

            g.use_resources(namespace, proposed.clone());
            Admission::Allow
        })
    }
}
