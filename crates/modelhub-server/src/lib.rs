//! Model Hub Server
//!
//! HTTP front for the model registry: lists the registered models and routes
//! prediction requests to them by key.

pub mod cli;
pub mod config;
pub mod routes;
pub mod state;

pub use cli::{Cli, LogFormat};
pub use config::ServerConfig;
pub use routes::{create_router, ApiError, PredictRequest};
pub use state::AppState;
