//! Model Hub Backends
//!
//! Inference backends behind stable string keys, and the registry that owns them.
//!
//! A backend pairs an immutable identity with a lazily loaded inference
//! capability. Loading is expensive and fallible, so it happens once, under a
//! per-backend lock, and its outcome is recorded as the backend's readiness:
//! - `Uninitialized` until the first `initialize()`
//! - `Ready` once the capability is loaded
//! - `Failed` if loading failed; the backend stays failed for the process lifetime
//!
//! The registry initializes every backend in bulk and isolates failures, so
//! one broken model never keeps the others from serving.
//!
//! The concrete capability (Candle + HuggingFace Hub) lives behind the
//! `ml-models` feature; everything else only sees the [`PipelineLoader`] seam.

pub mod aggregation;
pub mod backend;
pub mod catalog;
pub mod model_config;
pub mod pipeline;
pub mod registry;
pub mod sequence;
pub mod token;

#[cfg(feature = "ml-models")]
pub mod candle;

pub use backend::{Backend, ModelBackend};
pub use catalog::{builtin_backends, catalog_backends};
pub use model_config::{CatalogConfig, DeviceSpec, ModelEntry};
pub use pipeline::{InferencePipeline, PipelineLoader, PipelineSpec};
pub use registry::{InitSummary, ModelRegistry};
pub use sequence::SequenceClassificationBackend;
pub use token::TokenClassificationBackend;

#[cfg(feature = "ml-models")]
pub use crate::candle::CandleLoader;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::{Backend, ModelBackend};
    pub use crate::pipeline::{InferencePipeline, PipelineLoader, PipelineSpec};
    pub use crate::registry::ModelRegistry;
    pub use modelhub_core::{ModelIdentity, Prediction, RawValue, Readiness, TaskKind};
}
