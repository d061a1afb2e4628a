//! `ConfigValidator` (`spec.md` §4.6): duplicate configuration entries and
//! collisions introduced by newly enabling propagation for a kind.

mod common;

use hnc_core::admission::ConfigValidator;
use hnc_core::error::AdmissionReason;
use hnc_core::forest::{Forest, SourceObject};
use hnc_core::model::{Gvk, ObjectKey, PropagationMode};
use hnc_core::store::KindConfigEntry;

fn configmap_gvk() -> Gvk {
    Gvk::new("", "v1", "ConfigMap")
}

#[tokio::test]
async fn duplicate_entries_for_the_same_kind_are_rejected() {
    let forest = Forest::new();
    let validator = ConfigValidator::new(forest);

    let gvk = configmap_gvk();
    let proposed = vec![
        KindConfigEntry { gvk: gvk.clone(), mode: PropagationMode::Propagate },
        KindConfigEntry { gvk, mode: PropagationMode::Ignore },
    ];
    let result = validator.validate(&[], &proposed);
    assert!(matches!(result, hnc_core::error::Admission::Deny { reason: AdmissionReason::Invalid, .. }));
}

#[tokio::test]
async fn enabling_propagation_over_a_preexisting_ancestor_descendant_collision_is_rejected() {
    let forest = Forest::new();
    let gvk = configmap_gvk();
    forest.with_lock(|g| {
        g.set_parent("b", Some("a"));
        let key = ObjectKey { gvk: gvk.clone(), name: "x".to_string() };
        g.get_mut("a").source_objects.insert(key.clone(), SourceObject { propagatable: true, selector: None });
        g.get_mut("b").source_objects.insert(key, SourceObject { propagatable: true, selector: None });
    });
    let validator = ConfigValidator::new(forest);

    let current = vec![KindConfigEntry { gvk: gvk.clone(), mode: PropagationMode::Ignore }];
    let proposed = vec![KindConfigEntry { gvk, mode: PropagationMode::Propagate }];
    let result = validator.validate(&current, &proposed);
    assert!(matches!(result, hnc_core::error::Admission::Deny { reason: AdmissionReason::Conflict, .. }));
}

#[tokio::test]
async fn an_unrelated_kind_change_is_allowed() {
    let forest = Forest::new();
    let validator = ConfigValidator::new(forest);

    let proposed = vec![KindConfigEntry { gvk: configmap_gvk(), mode: PropagationMode::Propagate }];
    assert!(validator.validate(&[], &proposed).is_allowed());
}
