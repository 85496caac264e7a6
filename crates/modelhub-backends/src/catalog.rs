//! Built-in models and catalog-driven backend construction

use crate::backend::Backend;
use crate::model_config::{CatalogConfig, ModelEntry};
use crate::pipeline::{PipelineLoader, PipelineSpec};
use modelhub_core::{ModelIdentity, TaskKind};
use std::sync::Arc;

/// Binary sentiment classifier
pub fn sentiment_bert(loader: Arc<dyn PipelineLoader>) -> Backend {
    Backend::from_identity(
        ModelIdentity::new(
            "sentiment-bert",
            "Sentiment Analysis BERT",
            "PaoloPangallo/Sentiment_analisys_bert",
            TaskKind::TextClassification,
        ),
        loader,
    )
}

/// English named-entity recognizer (CoNLL-03 labels)
pub fn ner_base(loader: Arc<dyn PipelineLoader>) -> Backend {
    Backend::from_identity(
        ModelIdentity::new(
            "ner-base",
            "NER English BERT",
            "dbmdz/bert-large-cased-finetuned-conll03-english",
            TaskKind::TokenClassification,
        ),
        loader,
    )
}

/// Emotion classifier (Ekman emotions plus neutral)
pub fn emotion_bert(loader: Arc<dyn PipelineLoader>) -> Backend {
    Backend::from_identity(
        ModelIdentity::new(
            "emotion-bert",
            "Emotion Classification",
            "j-hartmann/emotion-english-distilroberta-base",
            TaskKind::TextClassification,
        ),
        loader,
    )
}

/// The default model set, in listing order
pub fn builtin_backends(loader: Arc<dyn PipelineLoader>) -> Vec<Backend> {
    vec![
        sentiment_bert(Arc::clone(&loader)),
        ner_base(Arc::clone(&loader)),
        emotion_bert(loader),
    ]
}

/// Backends described by a catalog file, in file order
pub fn catalog_backends(catalog: &CatalogConfig, loader: Arc<dyn PipelineLoader>) -> Vec<Backend> {
    catalog
        .models
        .iter()
        .map(|entry| entry_backend(entry, Arc::clone(&loader)))
        .collect()
}

fn entry_backend(entry: &ModelEntry, loader: Arc<dyn PipelineLoader>) -> Backend {
    let identity = ModelIdentity::new(
        entry.key.clone(),
        entry.name.clone(),
        entry.model_id.clone(),
        entry.task,
    );

    let mut spec = PipelineSpec::new(entry.model_id.clone(), entry.task).with_top_k(entry.top_k);
    if let Some(revision) = &entry.revision {
        spec = spec.with_revision(revision.clone());
    }

    Backend::new(identity, spec, loader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ModelBackend;
    use crate::pipeline::InferencePipeline;
    use crate::registry::ModelRegistry;
    use modelhub_core::{Error, Result};

    struct RefusingLoader;

    impl PipelineLoader for RefusingLoader {
        fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn InferencePipeline>> {
            Err(Error::init(&spec.model_id, "offline"))
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let backends = builtin_backends(Arc::new(RefusingLoader));
        let keys: Vec<&str> = backends.iter().map(|b| b.key()).collect();
        assert_eq!(keys, vec!["sentiment-bert", "ner-base", "emotion-bert"]);

        assert!(matches!(backends[0], Backend::Sequence(_)));
        assert!(matches!(backends[1], Backend::Token(_)));
        assert!(matches!(backends[2], Backend::Sequence(_)));
    }

    #[test]
    fn test_duplicate_catalog_keys_fail_wiring() {
        let catalog = CatalogConfig::from_yaml(
            r#"
models:
  - key: dup
    name: One
    model_id: org/one
    task: text-classification
  - key: dup
    name: Two
    model_id: org/two
    task: token-classification
"#,
        )
        .unwrap();

        let result =
            ModelRegistry::from_backends(catalog_backends(&catalog, Arc::new(RefusingLoader)));
        assert!(matches!(result, Err(Error::DuplicateKey { .. })));
    }
}
