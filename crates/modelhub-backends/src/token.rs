//! Token-classification backend (named entities)

use crate::backend::{BackendCore, ModelBackend};
use crate::pipeline::{PipelineLoader, PipelineSpec};
use modelhub_core::{Entity, Error, ModelIdentity, Prediction, RawValue, Readiness, Result};
use std::sync::Arc;

/// Backend whose output is an ordered list of entity spans.
///
/// Merging sub-word tokens into entities is the pipeline's job; this backend
/// only reshapes the aggregated groups into [`Entity`] records.
pub struct TokenClassificationBackend {
    core: BackendCore,
}

impl TokenClassificationBackend {
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

impl ModelBackend for TokenClassificationBackend {
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
        let entities = to_entities(&raw).map_err(|msg| Error::predict(self.key(), msg))?;
        let result = serde_json::to_value(entities)?;
        Ok(self.core.prediction(result))
    }
}

/// Reshape aggregated pipeline groups into entity spans
pub fn to_entities(raw: &RawValue) -> std::result::Result<Vec<Entity>, String> {
    let items = match raw {
        RawValue::Seq(items) => items,
        other => return Err(format!("expected a list of entities, got {:?}", other)),
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let start = item
                .get("start")
                .and_then(RawValue::as_offset)
                .ok_or_else(|| format!("entity {} has no valid 'start'", idx))?;
            let end = item
                .get("end")
                .and_then(RawValue::as_offset)
                .ok_or_else(|| format!("entity {} has no valid 'end'", idx))?;
            if end < start {
                return Err(format!("entity {} has end {} before start {}", idx, end, start));
            }

            // Ungrouped pipelines report `entity` instead of `entity_group`
            let entity = item
                .get("entity_group")
                .or_else(|| item.get("entity"))
                .and_then(RawValue::as_str)
                .ok_or_else(|| format!("entity {} has no label", idx))?;

            let score = item
                .get("score")
                .and_then(RawValue::as_f64)
                .filter(|s| s.is_finite());

            Ok(Entity {
                start,
                end,
                entity: entity.to_string(),
                score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: &str, start: usize, end: usize, score: Option<f32>) -> RawValue {
        RawValue::map([
            ("entity_group", RawValue::from(label)),
            ("score", RawValue::from(score)),
            ("word", RawValue::from("w")),
            ("start", RawValue::from(start)),
            ("end", RawValue::from(end)),
        ])
    }

    #[test]
    fn test_groups_become_entities() {
        let raw = RawValue::Seq(vec![
            group("PER", 0, 5, Some(0.5)),
            group("ORG", 15, 19, None),
        ]);

        let entities = to_entities(&raw).unwrap();
        assert_eq!(
            entities,
            vec![
                Entity {
                    start: 0,
                    end: 5,
                    entity: "PER".into(),
                    score: Some(0.5)
                },
                Entity {
                    start: 15,
                    end: 19,
                    entity: "ORG".into(),
                    score: None
                },
            ]
        );
    }

    #[test]
    fn test_entity_key_fallback() {
        let raw = RawValue::Seq(vec![RawValue::map([
            ("entity", RawValue::from("B-LOC")),
            ("start", RawValue::from(3usize)),
            ("end", RawValue::from(9usize)),
        ])]);

        let entities = to_entities(&raw).unwrap();
        assert_eq!(entities[0].entity, "B-LOC");
        assert_eq!(entities[0].score, None);
    }

    #[test]
    fn test_malformed_output_is_rejected() {
        assert!(to_entities(&RawValue::Null).is_err());
        assert!(to_entities(&RawValue::Seq(vec![group("PER", 5, 2, None)])).is_err());

        let no_start = RawValue::Seq(vec![RawValue::map([
            ("entity_group", RawValue::from("PER")),
            ("end", RawValue::from(5usize)),
        ])]);
        assert!(to_entities(&no_start).is_err());
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(to_entities(&RawValue::Seq(vec![])).unwrap().is_empty());
    }
}
