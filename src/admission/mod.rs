//! Admission validators (`spec.md` §4.6): pre-commit checks that preserve
//! tree invariants. All fail *closed* except the quota hook and the
//! namespace mutator, which fail *open* (`spec.md` §4.6).

mod config_validator;
mod hierarchy_validator;
mod hrq_validator;
mod namespace_validator;
mod object_validator;
mod quota_hook;

pub use config_validator::ConfigValidator;
pub use hierarchy_validator::{AuthorizationCheck, Authorizer, HierarchyValidator};
pub use hrq_validator::{AlwaysValidNames, HrqValidator, ResourceNameValidator};
pub use namespace_validator::NamespaceValidator;
pub use object_validator::ObjectValidator;
pub use quota_hook::QuotaAdmissionHook;

/// The HNC service account bypasses every validator (`spec.md` §4.6).
pub fn is_hnc_service_account(caller: &str, install_namespace: &str) -> bool {
    caller == format!("system:serviceaccount:{install_namespace}:hnc-controller-manager")
}
