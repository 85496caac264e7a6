//! Extension points for the underlying inference capability.

use modelhub_core::{RawValue, Result, TaskKind};
use std::sync::Arc;

/// What a loader needs to know to produce a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    /// Opaque model reference, passed through untouched (e.g. a hub repo id)
    pub model_id: String,

    /// Revision of the model reference, if pinned
    pub revision: Option<String>,

    /// Task the pipeline must perform
    pub task: TaskKind,

    /// Number of ranked candidates for classification tasks
    pub top_k: usize,
}

impl PipelineSpec {
    pub fn new(model_id: impl Into<String>, task: TaskKind) -> Self {
        Self {
            model_id: model_id.into(),
            revision: None,
            task,
            top_k: 1,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

/// A loaded inference capability.
///
/// Output mirrors what a transformers pipeline returns for the task: a list of
/// `{label, score}` maps for text classification, a list of
/// `{entity_group, score, word, start, end}` maps for token classification.
/// Implementations must be safe for concurrent read-only use.
pub trait InferencePipeline: Send + Sync {
    /// Run inference on a single input
    fn run(&self, text: &str) -> Result<RawValue>;
}

/// Pluggable source of inference pipelines.
///
/// Loading is blocking and may allocate model weights; callers run it off the
/// async reactor.
pub trait PipelineLoader: Send + Sync {
    /// Acquire and configure the capability described by `spec`
    fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn InferencePipeline>>;
}

impl<F> InferencePipeline for F
where
    F: Fn(&str) -> Result<RawValue> + Send + Sync,
{
    fn run(&self, text: &str) -> Result<RawValue> {
        self(text)
    }
}
