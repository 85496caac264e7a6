//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use modelhub_backends::ModelBackend;
use modelhub_core::{Error, ErrorClass, ModelIdentity, Prediction};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::state::AppState;

pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/models", get(list_models))
        .route("/api/predict/:key", post(predict))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(config.request_body_limit))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; `"*"` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(allowed))
}

/// Prediction request body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelIdentity>> {
    metrics::counter!("modelhub_requests_total", "endpoint" => "models").increment(1);
    Json(state.registry.list())
}

async fn predict(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    metrics::counter!("modelhub_requests_total", "endpoint" => "predict").increment(1);

    // The key is resolved before the body is looked at
    let Some(backend) = state.registry.get(&key) else {
        let err = Error::UnknownKey { key: key.clone() };
        return Err(ApiError::from_model_error(key, err));
    };

    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!("Rejected request body for '{}': {}", key, rejection);
            record_outcome(&key, "bad_request");
            return Err(ApiError::InvalidBody {
                status: rejection.status(),
                detail: rejection.body_text(),
            });
        }
    };

    let start = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || backend.predict(&req.text)).await;
    let elapsed_us = start.elapsed().as_micros() as u64;

    match outcome {
        Ok(Ok(prediction)) => {
            debug!("Prediction for '{}' completed in {}us", key, elapsed_us);
            record_outcome(&key, "ok");
            metrics::histogram!("modelhub_predict_latency_us", "model" => key.clone())
                .record(elapsed_us as f64);
            Ok(Json(prediction))
        }
        Ok(Err(e)) => Err(ApiError::from_model_error(key, e)),
        Err(e) => {
            error!("Prediction task for '{}' did not complete: {}", key, e);
            record_outcome(&key, "error");
            Err(ApiError::Internal)
        }
    }
}

/// Only registered keys may be used as label values
fn record_outcome(key: &str, outcome: &'static str) {
    metrics::counter!(
        "modelhub_predictions_total",
        "model" => key.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "models": state.registry.len(),
        "ready": state.registry.ready_count(),
    }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}

/// Metrics label for keys that resolve to no model
const UNKNOWN_MODEL_LABEL: &str = "unknown";

/// Request-boundary errors; bodies are `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    InvalidBody { status: StatusCode, detail: String },
    NotReady(String),
    Internal,
}

impl ApiError {
    /// Classify a backend error for the response, logging the detail server-side
    pub fn from_model_error(key: String, err: Error) -> Self {
        match err.class() {
            ErrorClass::NotFound => {
                warn!("Prediction requested for unknown model '{}'", key);
                record_outcome(UNKNOWN_MODEL_LABEL, "not_found");
                Self::NotFound(key)
            }
            ErrorClass::Unavailable => {
                warn!("Model '{}' is not ready: {}", key, err);
                record_outcome(&key, "not_ready");
                Self::NotReady(key)
            }
            ErrorClass::Config | ErrorClass::Internal => {
                error!("Prediction failed for model '{}': {}", key, err);
                record_outcome(&key, "error");
                Self::Internal
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidBody { status, .. } => *status,
            Self::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::NotFound(key) => format!("Model '{}' not found.", key),
            Self::InvalidBody { detail, .. } => detail.clone(),
            Self::NotReady(key) => format!("Model '{}' is not initialized or not ready.", key),
            Self::Internal => "Internal error during prediction.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}
