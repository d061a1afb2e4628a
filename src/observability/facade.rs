use std::sync::Arc;

/// The minimal logging capability a facade must expose. Reconcilers log
/// through this trait rather than calling `tracing` macros directly so that
/// a host can redirect or silence output without touching reconciler code.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, level: tracing::Level, target: &str, message: &str);
}

/// Unified access point for observability capabilities, mirroring
/// `spark-core::observability::facade::ObservabilityFacade`. The teacher's
/// version also exposes metrics and an ops-event bus; this crate only needs
/// structured logging (metrics/exporters are explicitly out of scope per
/// `spec.md` §1), so the facade is trimmed to that one capability.
pub trait ObservabilityFacade: Send + Sync + 'static {
    fn logger(&self) -> Arc<dyn Logger>;
}
