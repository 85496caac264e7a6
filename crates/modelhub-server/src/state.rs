use metrics_exporter_prometheus::PrometheusHandle;
use modelhub_backends::ModelRegistry;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Initialized registry; read-only once serving starts
    pub registry: Arc<ModelRegistry>,

    /// Prometheus handle for `/metrics`, if a recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
