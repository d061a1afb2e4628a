//! HNC-configuration validator (`spec.md` §4.6).

use crate::error::{Admission, AdmissionReason};
use crate::forest::Forest;
use crate::model::{Gvk, PropagationMode};
use crate::store::KindConfigEntry;
use std::collections::{HashMap, HashSet};

pub struct ConfigValidator {
    forest: Forest,
}

impl ConfigValidator {
    pub fn new(forest: Forest) -> Self {
        Self { forest }
    }

    pub fn validate(&self, current: &[KindConfigEntry], proposed: &[KindConfigEntry]) -> Admission {
        let mut seen = HashSet::new();
        for entry in proposed {
            let key = (entry.gvk.group.clone(), entry.gvk.kind.clone());
            if !seen.insert(key) {
                return Admission::deny(AdmissionReason::Invalid, format!("duplicate configuration entry for {:?}", entry.gvk));
            }
        }

        for entry in proposed {
            let old_mode = current.iter().find(|e| e.gvk == entry.gvk).map(|e| e.mode);
            let newly_propagating = entry.mode == PropagationMode::Propagate && old_mode != Some(PropagationMode::Propagate);
            if newly_propagating {
                if let Some(shadowed) = self.find_any_collision(&entry.gvk) {
                    return Admission::deny(
                        AdmissionReason::Conflict,
                        format!("enabling propagation for {:?} would overwrite an existing object in {shadowed}", entry.gvk),
                    );
                }
            }
        }
        Admission::Allow
    }

    fn find_any_collision(&self, gvk: &Gvk) -> Option<String> {
        self.forest.with_lock(|g| {
            let mut by_object: HashMap<String, Vec<String>> = HashMap::new();
            for namespace in g.names() {
                if let Some(node) = g.try_get(&namespace) {
                    for key in node.source_objects.keys() {
                        if &key.gvk == gvk {
                            by_object.entry(key.name.clone()).or_default().push(namespace.clone());
                        }
                    }
                }
            }
            for namespaces in by_object.values() {
                if namespaces.len() < 2 {
                    continue;
                }
                for a in namespaces {
                    for b in namespaces {
                        if a != b && g.ancestry(b).iter().any(|x| x == a) {
                            return Some(b.clone());
                        }
                    }
                }
            }
            None
        })
    }
}
