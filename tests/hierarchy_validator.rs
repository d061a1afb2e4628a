//! S5 (propagation overwrite guard).

mod common;

use common::AlwaysAuthorize;
use hnc_core::admission::HierarchyValidator;
use hnc_core::config::{ConfigSnapshot, StaticConfigSource};
use hnc_core::forest::Forest;
use hnc_core::model::{Gvk, ObjectKey};
use hnc_core::store::HierarchyDoc;
use std::sync::Arc;

#[tokio::test]
async fn s5_propagation_overwrite_guard() {
    let forest = Forest::new();
    let secret = Gvk::new("", "v1", "Secret");
    let key = ObjectKey { gvk: secret, name: "creds".to_string() };

    forest.with_lock(|g| {
        g.get_mut("a").exists = true;
        g.get_mut("b").exists = true;
        g.set_parent("b", Some("a"));
        // a's source Secret "creds", propagatable.
        g.set_source("a", key.clone(), true, None);
        // b's own, independent Secret "creds" (not a propagated copy).
        g.set_source("b", key.clone(), true, None);
    });

    let config = Arc::new(StaticConfigSource(ConfigSnapshot::default()));
    let validator = HierarchyValidator::new(forest.clone(), config.clone(), Arc::new(AlwaysAuthorize));

    let proposed = HierarchyDoc { spec_parent: Some("a".to_string()), ..Default::default() };
    let denied = validator.validate("admin", "b", &proposed).await;
    assert!(!denied.is_allowed(), "{denied:?}");
    assert!(format!("{denied}").contains('b'));

    // Removing b's independent secret clears the conflict.
    forest.with_lock(|g| g.clear_source("b", &key));
    let allowed = validator.validate("admin", "b", &proposed).await;
    assert!(allowed.is_allowed(), "{allowed:?}");
}
