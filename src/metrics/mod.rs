//! Restart counter exposed in the OpenMetrics text format.

use std::sync::Arc;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

mod server;

pub use server::MetricsServer;

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Unable to bind metrics listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("Metrics server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("Unable to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

/// Labels of `containers_restarts`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RestartLabels {
    /// Container name as reported by docker, e.g. `/web`
    pub container: String,
    /// Human readable outcome of the restart
    pub result: String,
}

struct Inner {
    registry: Registry,
    restarts: Family<RestartLabels, Counter>,
}

/// Shared handle to the restart counter. Cloning is cheap; the loop and the
/// HTTP server hold clones of the same registry.
#[derive(Clone)]
pub struct RestartMetrics {
    inner: Option<Arc<Inner>>,
}

impl RestartMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let restarts = Family::<RestartLabels, Counter>::default();
        registry.register(
            "containers_restarts",
            "Total number of containers restart",
            restarts.clone(),
        );
        Self {
            inner: Some(Arc::new(Inner { registry, restarts })),
        }
    }

    /// A recorder for which every call is a no-op.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::new() } else { Self::disabled() }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn record(&self, container: &str, result: &str) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner
            .restarts
            .get_or_create(&RestartLabels {
                container: container.to_string(),
                result: result.to_string(),
            })
            .inc();
    }

    #[cfg(test)]
    pub fn restart_count(&self, container: &str, result: &str) -> u64 {
        let Some(inner) = &self.inner else {
            return 0;
        };
        inner
            .restarts
            .get_or_create(&RestartLabels {
                container: container.to_string(),
                result: result.to_string(),
            })
            .get()
    }

    /// Render the registry in the OpenMetrics text format. Empty when
    /// metrics are disabled.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buffer = String::new();
        if let Some(inner) = &self.inner {
            encode(&mut buffer, &inner.registry)?;
        }
        Ok(buffer)
    }
}

impl Default for RestartMetrics {
    fn default() -> Self {
        Self::new()
    }
}
