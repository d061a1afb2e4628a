//! `ObjectValidator` (`spec.md` §4.6): admission for writes to propagated
//! kinds — canonical-copy protection, fabricated-provenance rejection,
//! malformed selectors, and sibling-namespace collisions.

mod common;

use hnc_core::admission::ObjectValidator;
use hnc_core::config::KindRegistry;
use hnc_core::error::AdmissionReason;
use hnc_core::forest::{Forest, Selector, SourceObject};
use hnc_core::model::{Gvk, ObjectKey, PropagationMode};
use hnc_core::store::PropagatedObjectDoc;
use std::collections::BTreeMap;
use std::sync::Arc;

fn secret_gvk() -> Gvk {
    Gvk::new("", "v1", "Secret")
}

fn doc(name: &str, inherited_from: Option<&str>, body: &[(&str, &str)]) -> PropagatedObjectDoc {
    PropagatedObjectDoc {
        gvk: secret_gvk(),
        namespace: "a".to_string(),
        name: name.to_string(),
        labels: BTreeMap::new(),
        annotations: BTreeMap::new(),
        finalizers: Vec::new(),
        inherited_from: inherited_from.map(|s| s.to_string()),
        resource_version: "1".to_string(),
        body: body.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        selector: None,
        is_service_account_token: false,
    }
}

fn propagating_registry(gvk: &Gvk) -> Arc<KindRegistry> {
    let kinds = Arc::new(KindRegistry::new());
    kinds.replace([(gvk.clone(), PropagationMode::Propagate)]);
    kinds
}

#[tokio::test]
async fn editing_a_propagated_copy_is_forbidden_unless_canonically_equal() {
    let gvk = secret_gvk();
    let forest = Forest::new();
    let validator = ObjectValidator::new(forest.clone(), propagating_registry(&gvk));

    let existing = doc("s", Some("parent"), &[("k", "v")]);
    let same = doc("s", Some("parent"), &[("k", "v")]);
    assert!(validator.validate_write(&gvk, "a", Some(&existing), &same).is_allowed());

    let edited = doc("s", Some("parent"), &[("k", "different")]);
    let result = validator.validate_write(&gvk, "a", Some(&existing), &edited);
    assert!(matches!(result, hnc_core::error::Admission::Deny { reason: AdmissionReason::Forbidden, .. }));
}

#[tokio::test]
async fn creating_an_object_with_fabricated_provenance_is_rejected() {
    let gvk = secret_gvk();
    let forest = Forest::new();
    let validator = ObjectValidator::new(forest.clone(), propagating_registry(&gvk));

    let proposed = doc("s", Some("parent"), &[]);
    let result = validator.validate_write(&gvk, "a", None, &proposed);
    assert!(matches!(result, hnc_core::error::Admission::Deny { reason: AdmissionReason::Forbidden, .. }));
}

#[tokio::test]
async fn empty_label_selector_is_malformed() {
    let gvk = secret_gvk();
    let forest = Forest::new();
    let validator = ObjectValidator::new(forest.clone(), propagating_registry(&gvk));

    let mut proposed = doc("s", None, &[]);
    proposed.selector = Some(Selector::Label(BTreeMap::new()));
    let result = validator.validate_write(&gvk, "a", None, &proposed);
    assert!(matches!(result, hnc_core::error::Admission::Deny { reason: AdmissionReason::Invalid, .. }));
}

#[tokio::test]
async fn colliding_with_an_existing_descendant_source_is_rejected() {
    let gvk = secret_gvk();
    let forest = Forest::new();
    forest.with_lock(|g| {
        g.set_parent("b", Some("a"));
        g.get_mut("b").source_objects.insert(ObjectKey { gvk: gvk.clone(), name: "s".to_string() }, SourceObject { propagatable: true, selector: None });
    });
    let validator = ObjectValidator::new(forest.clone(), propagating_registry(&gvk));

    let proposed = doc("s", None, &[]);
    let result = validator.validate_write(&gvk, "a", None, &proposed);
    assert!(matches!(result, hnc_core::error::Admission::Deny { reason: AdmissionReason::Conflict, .. }));
}

#[tokio::test]
async fn deleting_a_propagated_copy_outside_namespace_deletion_is_rejected() {
    let gvk = secret_gvk();
    let forest = Forest::new();
    let validator = ObjectValidator::new(forest.clone(), propagating_registry(&gvk));

    let obj = doc("s", Some("parent"), &[]);
    assert!(!validator.validate_delete(&obj, false).is_allowed());
    assert!(validator.validate_delete(&obj, true).is_allowed());
}
