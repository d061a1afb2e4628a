use super::facade::{Logger, ObservabilityFacade};
use std::sync::Arc;
use tracing::Level;

/// Default [`ObservabilityFacade`] backed by the `tracing` crate.
pub struct TracingFacade;

impl TracingFacade {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl Logger for TracingFacade {
    fn log(&self, level: Level, target: &'_ str, message: &str) {
        match level {
            Level::ERROR => tracing::error!(target: "hnc_core", %target, "{message}"),
            Level::WARN => tracing::warn!(target: "hnc_core", %target, "{message}"),
            Level::INFO => tracing::info!(target: "hnc_core", %target, "{message}"),
            Level::DEBUG => tracing::debug!(target: "hnc_core", %target, "{message}"),
            Level::TRACE => tracing::trace!(target: "hnc_core", %target, "{message}"),
        }
    }
}

impl ObservabilityFacade for TracingFacade {
    fn logger(&self) -> Arc<dyn Logger> {
        Arc::new(TracingFacade)
    }
}
