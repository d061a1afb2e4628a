//! The dynamic registry of propagated kinds (`spec.md` §9, "Dynamic kind
//! registry").
//!
//! The set of propagated kinds is determined at runtime from the HNC
//! configuration document, and can be re-moded (including to `Ignore`) at
//! any time. Readers (every propagator reconcile) vastly outnumber writers
//! (one configuration reconcile per config change), so the registry is an
//! [`arc_swap::ArcSwap`] snapshot rather than a lock — grounded on the
//! `arc-swap` dependency already present in the teacher's workspace
//! dependency table, used there for exactly this kind of rarely-written,
//! often-read table.

use crate::model::{Gvk, PropagationMode};
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct KindTable(BTreeMap<Gvk, PropagationMode>);

impl KindTable {
    pub fn mode(&self, gvk: &Gvk) -> PropagationMode {
        self.0.get(gvk).copied().unwrap_or(PropagationMode::Ignore)
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&Gvk, &PropagationMode)> {
        self.0.iter()
    }
}

pub struct KindRegistry {
    table: ArcSwap<KindTable>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self { table: ArcSwap::from_pointee(KindTable::default()) }
    }

    pub fn mode(&self, gvk: &Gvk) -> PropagationMode {
        self.table.load().mode(gvk)
    }

    pub fn snapshot(&self) -> Arc<KindTable> {
        self.table.load_full()
    }

    /// Atomically replaces the registry, returning the set of `(gvk, old
    /// mode)` pairs whose mode actually changed — those kinds need the
    /// full re-sweep `spec.md` §4.3 calls for on a mode transition.
    pub fn replace(&self, entries: impl IntoIterator<Item = (Gvk, PropagationMode)>) -> Vec<(Gvk, PropagationMode)> {
        let mut new_table = BTreeMap::new();
        for (gvk, mode) in entries {
            new_table.insert(gvk, mode);
        }
        let new_table = KindTable(new_table);
        let old = self.table.swap(Arc::new(new_table.clone()));
        let mut changed = Vec::new();
        for (gvk, mode) in new_table.kinds() {
            if old.mode(gvk) != *mode {
                changed.push((gvk.clone(), *mode));
            }
        }
        // A kind dropped entirely from the new config falls back to
        // `Ignore` per the "known limitation" in `spec.md` §9 (gracefully
        // stopping a per-kind worker is not implemented).
        for (gvk, old_mode) in old.kinds() {
            if !new_table.0.contains_key(gvk) && *old_mode != PropagationMode::Ignore {
                changed.push((gvk.clone(), PropagationMode::Ignore));
            }
        }
        changed
    }
}
