//! Hierarchy validator (`spec.md` §4.6).

use crate::config::ConfigurationSource;
use crate::error::{Admission, AdmissionReason};
use crate::forest::Forest;
use crate::model::ConditionReason;
use crate::store::HierarchyDoc;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// One authorization/confirmation check to run against the platform's own
/// RBAC once the forest lock is released (`spec.md` §4.6, the "server
/// checks" / authorisation-phase rule). Executing these against the
/// platform's real authorizer is a host binary's job — the real RBAC engine
/// is an external collaborator per `spec.md` §1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationCheck {
    /// The caller must be authorized to modify hierarchy within `namespace`.
    Authorize(String),
    /// The server must confirm `namespace` is genuinely absent (the old
    /// parent was never observed).
    ConfirmMissing(String),
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn check(&self, caller: &str, check: &AuthorizationCheck) -> bool;
}

pub struct HierarchyValidator {
    forest: Forest,
    config: Arc<dyn ConfigurationSource>,
    authorizer: Arc<dyn Authorizer>,
}

impl HierarchyValidator {
    pub fn new(forest: Forest, config: Arc<dyn ConfigurationSource>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { forest, config, authorizer }
    }

    pub async fn validate(&self, caller: &str, namespace: &str, proposed: &HierarchyDoc) -> Admission {
        let cfg = self.config.snapshot();

        for key in proposed.managed_labels.keys() {
            if !cfg.label_key_allowed(key) {
                return Admission::deny(AdmissionReason::Invalid, format!("managed label key {key} is not allowed"));
            }
        }
        for key in proposed.managed_annotations.keys() {
            if !cfg.annotation_key_allowed(key) {
                return Admission::deny(AdmissionReason::Invalid, format!("managed annotation key {key} is not allowed"));
            }
        }

        let (decision, old_parent, new_parent) = self.forest.with_lock(|g| {
            let Some((exists, has_halted_ancestor, manager_internal, is_sub, current_parent)) = g.try_get(namespace).map(|node| {
                (
                    node.exists,
                    node.conditions.iter().any(|c| c.reason == ConditionReason::Ancestor),
                    node.manager.is_internal(),
                    node.is_sub,
                    node.parent.clone(),
                )
            }) else {
                return (Some(Admission::deny(AdmissionReason::BadRequest, format!("namespace {namespace} is not observed"))), None, None);
            };
            if !exists {
                return (Some(Admission::deny(AdmissionReason::BadRequest, format!("namespace {namespace} is not observed"))), None, None);
            }
            if has_halted_ancestor {
                return (
                    Some(Admission::deny(AdmissionReason::Forbidden, format!("{namespace} has a halted ancestor"))),
                    None,
                    None,
                );
            }
            if !manager_internal && proposed.spec_parent.is_some() {
                return (
                    Some(Admission::deny(AdmissionReason::Forbidden, format!("{namespace} is externally managed and may not have a parent"))),
                    None,
                    None,
                );
            }
            if is_sub && proposed.spec_parent != current_parent {
                return (
                    Some(Admission::deny(AdmissionReason::Forbidden, format!("{namespace} is a subnamespace; its parent is immutable"))),
                    None,
                    None,
                );
            }
            if let Some(p) = &proposed.spec_parent {
                let parent_exists = g.try_get(p).map(|n| n.exists).unwrap_or(false);
                if !parent_exists {
                    return (Some(Admission::deny(AdmissionReason::BadRequest, format!("proposed parent {p} does not exist"))), None, None);
                }
            }
            if let Err(message) = g.can_set_parent(namespace, proposed.spec_parent.as_deref()) {
                return (Some(Admission::deny(AdmissionReason::Conflict, message)), None, None);
            }

            // Adopting the new parent must not shadow a user-created source
            // object anywhere in our own subtree (S5).
            if let Some(conflict) = self.find_propagation_conflict(g, namespace, proposed.spec_parent.as_deref()) {
                return (
                    Some(Admission::deny(
                        AdmissionReason::Conflict,
                        format!("adopting parent would overwrite an existing object in {conflict}"),
                    )),
                    None,
                    None,
                );
            }

            (None, Some(current_parent), Some(proposed.spec_parent.clone()))
        });

        if let Some(decision) = decision {
            return decision;
        }
        let old_parent = old_parent.flatten();
        let new_parent = new_parent.flatten();

        let checks = self.forest.with_lock(|g| compute_server_checks(g, &old_parent, &new_parent));
        for check in &checks {
            if !self.authorizer.check(caller, check).await {
                return Admission::deny(AdmissionReason::Unauthorized, format!("caller not authorized for {check:?}"));
            }
        }
        Admission::Allow
    }

    fn find_propagation_conflict(&self, g: &crate::forest::ForestGuard<'_>, namespace: &str, proposed_parent: Option<&str>) -> Option<String> {
        let Some(p) = proposed_parent else { return None };
        let mut subtree = vec![namespace.to_string()];
        subtree.extend(g.descendants(namespace));
        for ancestor in g.ancestry(p) {
            let Some(ancestor_node) = g.try_get(&ancestor) else { continue };
            for key in ancestor_node.source_objects.keys() {
                for name in &subtree {
                    if let Some(node) = g.try_get(name) {
                        if node.source_objects.contains_key(key) {
                            return Some(name.clone());
                        }
                    }
                }
            }
        }
        None
    }
}

/// The authorization-phase rule (`spec.md` §4.6): authorize against the
/// most-recent common ancestor if both trees match; the old root and the
/// new parent if the trees differ; the new parent alone when moving from a
/// root; the old root alone when moving to a root; a missing-confirmation
/// check when the old parent was never observed.
fn compute_server_checks(g: &crate::forest::ForestGuard<'_>, old_parent: &Option<String>, new_parent: &Option<String>) -> Vec<AuthorizationCheck> {
    match (old_parent, new_parent) {
        (None, None) => vec![],
        (None, Some(p)) => vec![AuthorizationCheck::Authorize(p.clone())],
        (Some(old), None) => {
            let root = g.ancestry(old).first().cloned().unwrap_or_else(|| old.clone());
            vec![AuthorizationCheck::Authorize(root)]
        }
        (Some(old), Some(new)) if old == new => vec![],
        (Some(old), Some(new)) => {
            let old_exists = g.try_get(old).map(|n| n.exists).unwrap_or(false);
            if !old_exists {
                return vec![AuthorizationCheck::ConfirmMissing(old.clone())];
            }
            let old_root = g.ancestry(old).first().cloned().unwrap_or_else(|| old.clone());
            let new_root = g.ancestry(new).first().cloned().unwrap_or_else(|| new.clone());
            if old_root == new_root {
                let old_ancestry = g.ancestry(old);
                let new_ancestry: HashSet<String> = g.ancestry(new).into_iter().collect();
                let mrca = old_ancestry.into_iter().rev().find(|a| new_ancestry.contains(a)).unwrap_or(old_root);
                vec![AuthorizationCheck::Authorize(mrca)]
            } else {
                vec![AuthorizationCheck::Authorize(old_root), AuthorizationCheck::Authorize(new.clone())]
            }
        }
    }
}
