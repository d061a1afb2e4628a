//! HRQ validator (`spec.md` §4.6): the document's resource list is validated
//! by dry-running it as a platform resource-quota specification.

use crate::error::{Admission, AdmissionReason};
use crate::model::ResourceList;

/// A thin seam over the platform's own resource-quota spec validation
/// (`spec.md` §1 treats the platform's built-in resource-quota controller as
/// an external collaborator). A host binary supplies the real dry-run;
/// [`AlwaysValidNames`] accepts anything and exists for tests.
pub trait ResourceNameValidator: Send + Sync {
    fn is_valid(&self, resource_name: &str) -> bool;
}

pub struct AlwaysValidNames;

impl ResourceNameValidator for AlwaysValidNames {
    fn is_valid(&self, _resource_name: &str) -> bool {
        true
    }
}

pub struct HrqValidator<V: ResourceNameValidator> {
    names: V,
}

impl<V: ResourceNameValidator> HrqValidator<V> {
    pub fn new(names: V) -> Self {
        Self { names }
    }

    pub fn validate(&self, hard: &ResourceList) -> Admission {
        let invalid: Vec<&str> = hard.keys().map(String::as_str).filter(|name| !self.names.is_valid(name)).collect();
        if invalid.is_empty() {
            Admission::Allow
        } else {
            Admission::deny(AdmissionReason::Invalid, format!("invalid quota resource name(s): {}", invalid.join(", ")))
        }
    }
}
