//! Sequence-classification backend (sentiment, emotion, ...)

use crate::backend::{BackendCore, ModelBackend};
use crate::pipeline::{PipelineLoader, PipelineSpec};
use modelhub_core::{normalize, Error, ModelIdentity, Prediction, RawValue, Readiness, Result};
use serde_json::Value;
use std::sync::Arc;

/// Backend whose output is a label with a confidence score
pub struct SequenceClassificationBackend {
    core: BackendCore,
}

impl SequenceClassificationBackend {
    pub fn new(
        identity: ModelIdentity,
        spec: PipelineSpec,
        loader: Arc<dyn PipelineLoader>,
    ) -> Self {
        Self {
            core: BackendCore::new(identity, spec, loader),
        }
    }
}

impl ModelBackend for SequenceClassificationBackend {
    fn identity(&self) -> &ModelIdentity {
        self.core.identity()
    }

    fn readiness(&self) -> Readiness {
        self.core.readiness()
    }

    fn initialize(&self) -> Result<()> {
        self.core.initialize()
    }

    fn failure(&self) -> Option<String> {
        self.core.failure()
    }

    fn predict(&self, text: &str) -> Result<Prediction> {
        let raw = self.core.run(text)?;
        let result = shape_labels(raw).map_err(|msg| Error::predict(self.key(), msg))?;
        Ok(self.core.prediction(result))
    }
}

/// Reshape classifier output into `{label, score}` objects.
///
/// A single mapping stays a single object; a ranked list stays a list. A list
/// wrapping exactly one ranked list (batched output) is unwrapped.
pub fn shape_labels(raw: RawValue) -> std::result::Result<Value, String> {
    match raw {
        RawValue::Map(_) => label_score(&raw),
        RawValue::Seq(mut items) => {
            if items.len() == 1 && matches!(items[0], RawValue::Seq(_)) {
                return shape_labels(items.remove(0));
            }
            items
                .iter()
                .map(label_score)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        other => Err(format!("unexpected classification output: {:?}", other)),
    }
}

fn label_score(item: &RawValue) -> std::result::Result<Value, String> {
    let label = item
        .get("label")
        .and_then(RawValue::as_str)
        .ok_or_else(|| "classification output is missing 'label'".to_string())?;
    let score = item
        .get("score")
        .filter(|s| s.as_f64().is_some())
        .ok_or_else(|| format!("classification output for '{}' is missing 'score'", label))?;

    Ok(normalize(RawValue::map([
        ("label", RawValue::from(label)),
        ("score", score.clone()),
    ])))
}
