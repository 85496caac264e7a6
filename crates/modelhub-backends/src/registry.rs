//! Model registry: key -> backend mapping and bulk initialization

use crate::backend::{Backend, ModelBackend};
use modelhub_core::{Error, ModelIdentity, Readiness, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry owning every backend for the life of the process.
///
/// Wiring (`register`) and `initialize_all` take `&mut self` and run during
/// startup; once shared behind an `Arc`, lookups need no locking.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    /// Backends in registration order
    backends: Vec<Arc<Backend>>,

    /// Key -> index into `backends`
    by_key: HashMap<String, usize>,

    initialized: bool,
}

/// Outcome of bulk initialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitSummary {
    /// Keys that are ready to serve
    pub ready: Vec<String>,

    /// Keys that failed, with the recorded reason
    pub failed: Vec<(String, String)>,
}

impl InitSummary {
    pub fn total(&self) -> usize {
        self.ready.len() + self.failed.len()
    }
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from backends, in order
    pub fn from_backends(backends: impl IntoIterator<Item = Backend>) -> Result<Self> {
        let mut registry = Self::new();
        for backend in backends {
            registry.register(backend)?;
        }
        Ok(registry)
    }

    /// Register a backend under its key.
    ///
    /// A duplicate key is rejected and leaves the registry unchanged.
    pub fn register(&mut self, backend: Backend) -> Result<()> {
        let key = backend.key().to_string();

        if self.by_key.contains_key(&key) {
            return Err(Error::DuplicateKey { key });
        }

        info!(
            "Registered model '{}' ({}, {})",
            key,
            backend.identity().model_id,
            backend.identity().task
        );

        self.by_key.insert(key, self.backends.len());
        self.backends.push(Arc::new(backend));
        Ok(())
    }

    /// Initialize every registered backend once.
    ///
    /// A failing backend is logged and left `Failed`; the rest still load.
    /// Calls after the first do nothing and report the current state.
    pub fn initialize_all(&mut self) -> InitSummary {
        if self.initialized {
            debug!("Model registry already initialized, skipping");
            return self.summary();
        }

        info!("Initializing {} registered models", self.backends.len());

        for backend in &self.backends {
            match backend.initialize() {
                Ok(()) => info!("✓ Initialized model: {}", backend.key()),
                Err(e) => warn!("✗ Failed to initialize model {}: {}", backend.key(), e),
            }
        }

        self.initialized = true;

        let summary = self.summary();
        info!(
            "Model registry initialized with {}/{} models ready",
            summary.ready.len(),
            summary.total()
        );
        summary
    }

    /// Whether bulk initialization has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Identity of every backend, in registration order, regardless of readiness
    pub fn list(&self) -> Vec<ModelIdentity> {
        self.backends.iter().map(|b| b.identity().clone()).collect()
    }

    /// Look up a backend by key
    pub fn get(&self, key: &str) -> Option<Arc<Backend>> {
        self.by_key
            .get(key)
            .map(|&idx| Arc::clone(&self.backends[idx]))
    }

    /// Readiness of every backend
    pub fn summary(&self) -> InitSummary {
        let mut summary = InitSummary::default();
        for backend in &self.backends {
            match backend.readiness() {
                Readiness::Ready => summary.ready.push(backend.key().to_string()),
                Readiness::Failed => summary
                    .failed
                    .push((backend.key().to_string(), backend.failure().unwrap_or_default())),
                Readiness::Uninitialized => {}
            }
        }
        summary
    }

    /// Number of ready backends
    pub fn ready_count(&self) -> usize {
        self.backends
            .iter()
            .filter(|b| b.readiness().is_ready())
            .count()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
