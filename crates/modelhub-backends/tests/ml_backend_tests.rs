//! Built-in models against real weights from the HuggingFace Hub.
//!
//! Downloads several hundred megabytes; set `MODELHUB_RUN_EXTERNAL_ML_TESTS=1`
//! to run.

#![cfg(feature = "ml-models")]

use modelhub_backends::catalog::{emotion_bert, ner_base, sentiment_bert};
use modelhub_backends::{CandleLoader, DeviceSpec, ModelBackend};
use modelhub_core::Readiness;
use std::sync::Arc;

fn external_ml_tests_enabled() -> bool {
    std::env::var("MODELHUB_RUN_EXTERNAL_ML_TESTS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn loader() -> Arc<CandleLoader> {
    Arc::new(
        CandleLoader::new()
            .with_token(std::env::var("HF_TOKEN").ok())
            .with_device(DeviceSpec::Cpu),
    )
}

#[test]
fn test_ner_finds_person_and_organization() {
    if !external_ml_tests_enabled() {
        return;
    }

    let backend = ner_base(loader());
    backend.initialize().unwrap();
    assert_eq!(backend.readiness(), Readiness::Ready);

    let prediction = backend.predict("Alice works at Acme Corporation in Paris").unwrap();
    let entities = prediction.result.as_array().unwrap();

    let labels: Vec<&str> = entities
        .iter()
        .filter_map(|e| e["entity"].as_str())
        .collect();
    assert!(labels.contains(&"PER"), "entities: {:?}", entities);
    assert!(labels.contains(&"LOC"), "entities: {:?}", entities);

    let person = entities.iter().find(|e| e["entity"] == "PER").unwrap();
    assert_eq!(person["start"], 0);
    assert_eq!(person["end"], 5);
}

#[test]
fn test_sentiment_returns_label_and_score() {
    if !external_ml_tests_enabled() {
        return;
    }

    let backend = sentiment_bert(loader());
    backend.initialize().unwrap();

    let prediction = backend.predict("I absolutely love this!").unwrap();
    let top = &prediction.result[0];
    assert!(top["label"].is_string());
    let score = top["score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
}

#[test]
fn test_emotion_detects_joy() {
    if !external_ml_tests_enabled() {
        return;
    }

    let backend = emotion_bert(loader());
    backend.initialize().unwrap();

    let prediction = backend
        .predict("This is the happiest day of my life!")
        .unwrap();
    assert_eq!(prediction.result[0]["label"], "joy");
}

#[test]
fn test_missing_repository_fails_initialization() {
    if !external_ml_tests_enabled() {
        return;
    }

    let backend = modelhub_backends::Backend::from_identity(
        modelhub_core::ModelIdentity::new(
            "missing",
            "Missing",
            "modelhub-tests/does-not-exist",
            modelhub_core::TaskKind::TextClassification,
        ),
        loader(),
    );

    assert!(backend.initialize().is_err());
    assert_eq!(backend.readiness(), Readiness::Failed);
}
