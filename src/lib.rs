//! `hnc-core`: the in-memory forest, reconcile pipeline and admission/quota
//! engine behind a hierarchical namespace controller (`spec.md` §1–§9).
//!
//! This crate models the controller's core logic only. The orchestration
//! platform's API server/object store, CLI plugin, certificate rotator, CRD
//! installation, metrics exporters, leader election and watch plumbing are
//! all external collaborators (`spec.md` §1, `SPEC_FULL.md` §0); a host
//! binary wires a concrete [`store::ObjectStore`] and drives
//! [`controller::Controller`] to turn this crate into a running service.

pub mod admission;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod forest;
pub mod model;
pub mod observability;
pub mod reconcile;
pub mod store;

pub use error::{Admission, AdmissionReason, HncError, Result};
pub use forest::Forest;
pub use model::{Gvk, ObjectKey};
