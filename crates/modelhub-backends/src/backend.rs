//! Backend trait, readiness tracking, and the closed set of backend kinds

use crate::pipeline::{InferencePipeline, PipelineLoader, PipelineSpec};
use crate::sequence::SequenceClassificationBackend;
use crate::token::TokenClassificationBackend;
use modelhub_core::{Error, ModelIdentity, Prediction, RawValue, Readiness, Result, TaskKind};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shared capability interface of every backend
pub trait ModelBackend: Send + Sync {
    /// Identity metadata; available regardless of readiness
    fn identity(&self) -> &ModelIdentity;

    /// Current lifecycle state
    fn readiness(&self) -> Readiness;

    /// Load the underlying capability once.
    ///
    /// Calling again after success is a no-op. Calling again after a failure
    /// returns the recorded failure without another load attempt.
    fn initialize(&self) -> Result<()>;

    /// Run inference and return task-shaped, JSON-safe output.
    ///
    /// Fails with [`Error::NotReady`] unless the backend is `Ready`.
    fn predict(&self, text: &str) -> Result<Prediction>;

    /// Recorded initialization failure, if the backend is `Failed`
    fn failure(&self) -> Option<String>;

    fn key(&self) -> &str {
        &self.identity().key
    }
}

enum SlotState {
    Uninitialized,
    Ready(Arc<dyn InferencePipeline>),
    Failed(String),
}

/// Identity plus the lazily loaded pipeline handle.
///
/// `init_lock` serializes load attempts for this backend only; readers of
/// `state` never wait on a load in progress.
pub(crate) struct BackendCore {
    identity: ModelIdentity,
    spec: PipelineSpec,
    loader: Arc<dyn PipelineLoader>,
    init_lock: Mutex<()>,
    state: RwLock<SlotState>,
}

impl BackendCore {
    pub(crate) fn new(
        identity: ModelIdentity,
        spec: PipelineSpec,
        loader: Arc<dyn PipelineLoader>,
    ) -> Self {
        Self {
            identity,
            spec,
            loader,
            init_lock: Mutex::new(()),
            state: RwLock::new(SlotState::Uninitialized),
        }
    }

    pub(crate) fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    pub(crate) fn readiness(&self) -> Readiness {
        match &*self.state.read() {
            SlotState::Uninitialized => Readiness::Uninitialized,
            SlotState::Ready(_) => Readiness::Ready,
            SlotState::Failed(_) => Readiness::Failed,
        }
    }

    pub(crate) fn failure(&self) -> Option<String> {
        match &*self.state.read() {
            SlotState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub(crate) fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock();

        match &*self.state.read() {
            SlotState::Ready(_) => return Ok(()),
            SlotState::Failed(message) => {
                return Err(Error::init(&self.identity.key, message));
            }
            SlotState::Uninitialized => {}
        }

        info!(
            "Loading pipeline for '{}' -> {}",
            self.identity.key, self.identity.model_id
        );
        let start = Instant::now();

        match self.loader.load(&self.spec) {
            Ok(pipeline) => {
                *self.state.write() = SlotState::Ready(pipeline);
                info!(
                    "'{}' ready in {}ms",
                    self.identity.key,
                    start.elapsed().as_millis()
                );
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    Error::Init { message, .. } => message,
                    other => other.to_string(),
                };
                *self.state.write() = SlotState::Failed(message.clone());
                Err(Error::init(&self.identity.key, message))
            }
        }
    }

    /// Run the pipeline; the single readiness gate for every backend kind
    pub(crate) fn run(&self, text: &str) -> Result<RawValue> {
        let pipeline = match &*self.state.read() {
            SlotState::Ready(pipeline) => Arc::clone(pipeline),
            SlotState::Uninitialized => {
                return Err(Error::not_ready(&self.identity.key, Readiness::Uninitialized))
            }
            SlotState::Failed(_) => {
                return Err(Error::not_ready(&self.identity.key, Readiness::Failed))
            }
        };

        debug!(
            "Running '{}' on text len={}",
            self.identity.key,
            text.chars().count()
        );

        pipeline.run(text).map_err(|e| match e {
            Error::Predict { message, .. } => Error::predict(&self.identity.key, message),
            other => Error::predict(&self.identity.key, other),
        })
    }

    pub(crate) fn prediction(&self, result: serde_json::Value) -> Prediction {
        Prediction {
            result,
            model_id: self.identity.model_id.clone(),
            task: self.identity.task,
        }
    }
}

/// A registered backend, one variant per task kind
pub enum Backend {
    Sequence(SequenceClassificationBackend),
    Token(TokenClassificationBackend),
}

impl Backend {
    /// Build the variant matching the identity's task kind
    pub fn new(
        identity: ModelIdentity,
        spec: PipelineSpec,
        loader: Arc<dyn PipelineLoader>,
    ) -> Self {
        match identity.task {
            TaskKind::TextClassification => {
                Self::Sequence(SequenceClassificationBackend::new(identity, spec, loader))
            }
            TaskKind::TokenClassification => {
                Self::Token(TokenClassificationBackend::new(identity, spec, loader))
            }
        }
    }

    /// Build a backend whose pipeline spec is derived from the identity
    pub fn from_identity(identity: ModelIdentity, loader: Arc<dyn PipelineLoader>) -> Self {
        let spec = PipelineSpec::new(identity.model_id.clone(), identity.task);
        Self::new(identity, spec, loader)
    }

    fn inner(&self) -> &dyn ModelBackend {
        match self {
            Self::Sequence(backend) => backend as &dyn ModelBackend,
            Self::Token(backend) => backend as &dyn ModelBackend,
        }
    }
}

impl ModelBackend for Backend {
    fn identity(&self) -> &ModelIdentity {
        self.inner().identity()
    }

    fn readiness(&self) -> Readiness {
        self.inner().readiness()
    }

    fn initialize(&self) -> Result<()> {
        self.inner().initialize()
    }

    fn predict(&self, text: &str) -> Result<Prediction> {
        self.inner().predict(text)
    }

    fn failure(&self) -> Option<String> {
        self.inner().failure()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("identity", self.identity())
            .field("readiness", &self.readiness())
            .finish()
    }
}
