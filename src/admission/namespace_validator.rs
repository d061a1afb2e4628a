//! Namespace validator (`spec.md` §4.6): admission for the namespace object
//! itself.

use crate::config::ConfigurationSource;
use crate::error::{Admission, AdmissionReason};
use crate::forest::Forest;
use crate::model::Manager;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct NamespaceValidator {
    forest: Forest,
    config: Arc<dyn ConfigurationSource>,
}

impl NamespaceValidator {
    pub fn new(forest: Forest, config: Arc<dyn ConfigurationSource>) -> Self {
        Self { forest, config }
    }

    /// Reject illegal additions/removals of the controller-maintained
    /// tree-depth labels and illegal toggles of the `included-namespace`
    /// label.
    pub fn validate_update(&self, existing_labels: &BTreeMap<String, String>, proposed_labels: &BTreeMap<String, String>) -> Admission {
        let cfg = self.config.snapshot();
        let tree_label_suffix = format!(".tree.{}/depth", cfg.meta_group);
        let mut keys: std::collections::BTreeSet<&String> = existing_labels.keys().collect();
        keys.extend(proposed_labels.keys());
        for key in keys {
            if key.ends_with(&tree_label_suffix) && existing_labels.get(key) != proposed_labels.get(key) {
                return Admission::deny(AdmissionReason::Forbidden, "tree-depth labels are controller-maintained");
            }
        }
        let included_key = format!("{}/included-namespace", cfg.meta_group);
        if existing_labels.get(&included_key) != proposed_labels.get(&included_key) {
            return Admission::deny(AdmissionReason::Forbidden, "the included-namespace label is controller-maintained");
        }
        Admission::Allow
    }

    /// Reject creating a namespace whose name an externally managed
    /// namespace has already claimed as one of its tree labels.
    pub fn validate_create(&self, name: &str, manager: &Manager) -> Admission {
        if !manager.is_internal() {
            return Admission::Allow;
        }
        let claimed = self.forest.with_lock(|g| {
            g.names()
                .into_iter()
                .any(|n| g.try_get(&n).map(|node| !node.manager.is_internal() && node.tree_labels.contains_key(name)).unwrap_or(false))
        });
        if claimed {
            return Admission::deny(AdmissionReason::Conflict, format!("{name} is already claimed as a tree label by an externally managed namespace"));
        }
        Admission::Allow
    }

    pub fn validate_delete(&self, name: &str) -> Admission {
        self.forest.with_lock(|g| {
            let (is_sub, allow_cascading_deletion, children) = {
                let node = g.get(name);
                (node.is_sub, node.allow_cascading_deletion, node.children.clone())
            };
            if is_sub {
                return Admission::deny(AdmissionReason::Forbidden, format!("{name} is a subnamespace; delete its anchor instead"));
            }
            let has_sub_children = children.iter().any(|c| g.try_get(c).map(|n| n.is_sub).unwrap_or(false));
            if has_sub_children && !allow_cascading_deletion {
                return Admission::deny(AdmissionReason::Forbidden, format!("{name} has subnamespace children; set allowCascadingDeletion first"));
            }
            Admission::Allow
        })
    }
}
