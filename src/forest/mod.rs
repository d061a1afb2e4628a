//! The in-memory forest: the authoritative mutable graph of namespaces plus
//! all derived state (`spec.md` §3).

mod graph;
mod namespace;

pub use graph::{AffectedSet, Forest, ForestGuard};
pub use namespace::{NamespaceNode, NamespaceQuota, Selector, SourceObject};
