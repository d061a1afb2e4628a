//! P1 (parent/child back-pointer consistency) and P3 (tree-depth labels),
//! checked against randomly generated acyclic forests via `proptest`,
//! grounded on the teacher's own state-machine property tests.

use hnc_core::forest::Forest;
use proptest::prelude::*;

const NAMES: [&str; 8] = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"];

/// A parent assignment where `parents[i]` (when `Some`) always names an
/// earlier index, guaranteeing the resulting forest is acyclic by
/// construction so the property holds on deliberately well-formed trees
/// rather than ones the cycle guard would itself reject.
fn acyclic_parent_assignment() -> impl Strategy<Value = Vec<Option<usize>>> {
    proptest::collection::vec(proptest::option::of(0usize..NAMES.len()), NAMES.len())
        .prop_filter("parent index must precede child index", |parents| {
            parents.iter().enumerate().all(|(i, p)| p.map_or(true, |p| p < i))
        })
}

proptest! {
    #[test]
    fn p1_back_pointers_are_mutually_consistent(parents in acyclic_parent_assignment()) {
        let forest = Forest::new();
        forest.with_lock(|g| {
            for (i, parent) in parents.iter().enumerate() {
                if let Some(p) = parent {
                    g.set_parent(NAMES[i], Some(NAMES[*p]));
                }
            }
        });
        forest.with_lock(|g| {
            for name in g.names() {
                let parent = g.get(&name).parent.clone();
                if let Some(parent) = parent {
                    let is_child = g.get(&parent).children.contains(&name);
                    prop_assert!(is_child);
                }
            }
            for name in g.names() {
                let children: Vec<String> = g.get(&name).children.iter().cloned().collect();
                for child in children {
                    prop_assert_eq!(g.get(&child).parent.as_deref(), Some(name.as_str()));
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn p3_tree_depth_follows_ancestry(parents in acyclic_parent_assignment()) {
        let forest = Forest::new();
        forest.with_lock(|g| {
            for (i, parent) in parents.iter().enumerate() {
                if let Some(p) = parent {
                    g.set_parent(NAMES[i], Some(NAMES[*p]));
                }
            }
        });
        forest.with_lock(|g| {
            for name in g.names() {
                if !g.cycle_names(&name).is_empty() {
                    continue;
                }
                let (self_depth, parent) = {
                    let node = g.get(&name);
                    (node.tree_labels.get(&name).copied(), node.parent.clone())
                };
                prop_assert_eq!(self_depth, Some(0));
                if let Some(parent) = parent {
                    // tree_depth[parent] = tree_depth_at_parent[parent] (always 0) + 1,
                    // unless the parent itself halted and stopped label propagation.
                    if !g.get(&parent).is_halted() {
                        let depth_at_parent = g.get(&name).tree_labels.get(&parent).copied();
                        prop_assert_eq!(depth_at_parent, Some(1));
                    }
                }
            }
            Ok(())
        })?;
    }
}
