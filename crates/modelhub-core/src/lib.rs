//! Model Hub Core
//!
//! Core types and utilities shared across Model Hub components.
//!
//! This crate provides:
//! - Model identity records and task kinds
//! - The readiness lifecycle shared by every backend
//! - Error types and result handling
//! - Output normalization into JSON-safe value trees

pub mod error;
pub mod normalize;
pub mod types;

pub use error::{Error, ErrorClass, Result};
pub use normalize::{normalize, RawValue};
pub use types::{Entity, ModelIdentity, Prediction, Readiness, TaskKind};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorClass, Result};
    pub use crate::normalize::{normalize, RawValue};
    pub use crate::types::{Entity, ModelIdentity, Prediction, Readiness, TaskKind};
}
