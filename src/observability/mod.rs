//! Observability facade.
//!
//! Grounded on `spark-core::observability::facade`: a small object-safe
//! trait gives reconcilers and admission handlers a single injection point
//! for logging instead of each one reaching for a global. The teacher's own
//! `ObservabilityFacade` is backend-agnostic (it is `no_std`); here the
//! default implementation is backed by the `tracing` / `tracing-subscriber`
//! crates named in the teacher's workspace dependency table, since this
//! crate is `std`-only and needs a concrete logging backend (see
//! `SPEC_FULL.md` §7.1).

mod facade;
mod tracing_facade;

pub use facade::{Logger, ObservabilityFacade};
pub use tracing_facade::TracingFacade;

use std::sync::Arc;

/// A no-op facade, for tests that don't want log noise. Grounded on the
/// teacher's `test_stubs` module, which keeps one canonical stub per
/// contract rather than letting every test hand-roll its own.
pub struct NoopFacade;

impl Logger for NoopFacade {
    fn log(&self, _level: tracing::Level, _target: &str, _message: &str) {}
}

impl ObservabilityFacade for NoopFacade {
    fn logger(&self) -> Arc<dyn Logger> {
        Arc::new(NoopFacade)
    }
}
