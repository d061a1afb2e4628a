//! Object validator (`spec.md` §4.6): admission for writes to propagated
//! kinds.

use crate::config::KindRegistry;
use crate::error::{Admission, AdmissionReason};
use crate::forest::Forest;
use crate::model::{Gvk, ObjectKey, PropagationMode};
use crate::store::PropagatedObjectDoc;
use std::sync::Arc;

pub struct ObjectValidator {
    forest: Forest,
    kinds: Arc<KindRegistry>,
}

impl ObjectValidator {
    pub fn new(forest: Forest, kinds: Arc<KindRegistry>) -> Self {
        Self { forest, kinds }
    }

    pub fn validate_write(&self, gvk: &Gvk, namespace: &str, existing: Option<&PropagatedObjectDoc>, proposed: &PropagatedObjectDoc) -> Admission {
        let unmanaged = self.forest.with_lock(|g| !g.get(namespace).manager.is_internal());
        if unmanaged {
            return Admission::Allow;
        }
        if self.kinds.mode(gvk) != PropagationMode::Propagate {
            return Admission::Allow;
        }

        if let Some(existing) = existing {
            if existing.inherited_from.is_some() {
                // Update of a propagated copy: only the controller's own
                // canonical content may change.
                if canonical_eq(existing, proposed) {
                    return Admission::Allow;
                }
                return Admission::deny(AdmissionReason::Forbidden, "propagated copies may only be modified by the controller");
            }
        } else if proposed.inherited_from.is_some() {
            return Admission::deny(AdmissionReason::Forbidden, "may not create an object that claims to already be a propagated copy");
        }

        if let Some(selector) = &proposed.selector {
            if !selector_well_formed(selector) {
                return Admission::deny(AdmissionReason::Invalid, "selector annotation is malformed or specifies more than one selector form");
            }
        }

        let key = ObjectKey { gvk: gvk.clone(), name: proposed.name.clone() };
        let collision = self.forest.with_lock(|g| {
            for descendant in g.descendants(namespace) {
                let Some(node) = g.try_get(&descendant) else { continue };
                if !node.source_objects.contains_key(&key) {
                    continue;
                }
                if let Some(selector) = &proposed.selector {
                    if !g.selector_includes(&descendant, selector) {
                        continue;
                    }
                }
                return Some(descendant);
            }
            None
        });
        if let Some(descendant) = collision {
            return Admission::deny(AdmissionReason::Conflict, format!("would collide with an existing object in {descendant}"));
        }

        Admission::Allow
    }

    pub fn validate_delete(&self, obj: &PropagatedObjectDoc, namespace_being_deleted: bool) -> Admission {
        if obj.inherited_from.is_some() && !namespace_being_deleted {
            return Admission::deny(AdmissionReason::Forbidden, "propagated copies may only be deleted along with their namespace");
        }
        Admission::Allow
    }
}

fn selector_well_formed(selector: &crate::forest::Selector) -> bool {
    // At most one selector form is representable by the type itself
    // (`Selector` is an enum, not a bag of optional annotations), so the
    // only remaining malformed case is an empty label selector, which would
    // match every namespace rather than expressing any real restriction.
    !matches!(selector, crate::forest::Selector::Label(m) if m.is_empty())
}

fn canonical_eq(existing: &PropagatedObjectDoc, proposed: &PropagatedObjectDoc) -> bool {
    existing.labels == proposed.labels && existing.annotations == proposed.annotations && existing.body == proposed.body
}
