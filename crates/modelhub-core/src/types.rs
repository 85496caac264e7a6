//! Core types for Model Hub

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of inference a backend performs
///
/// The task decides how raw output is reshaped; it never affects routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Whole-input classification (sentiment, emotion, ...)
    #[serde(alias = "sentiment-analysis")]
    TextClassification,
    /// Per-span classification (named entities)
    #[serde(alias = "ner")]
    TokenClassification,
}

impl TaskKind {
    /// Wire name of the task
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextClassification => "text-classification",
            Self::TokenClassification => "token-classification",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text-classification" | "sentiment-analysis" => Ok(Self::TextClassification),
            "token-classification" | "ner" => Ok(Self::TokenClassification),
            other => Err(Error::config(format!("unknown task kind '{}'", other))),
        }
    }
}

/// Immutable identity of a backend, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    /// Stable lookup key
    pub key: String,

    /// Human-readable label
    pub name: String,

    /// Opaque reference handed to the inference capability (e.g. a hub repo id)
    pub model_id: String,

    /// Kind of inference
    pub task: TaskKind,
}

impl ModelIdentity {
    /// Create a new identity record
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        model_id: impl Into<String>,
        task: TaskKind,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            model_id: model_id.into(),
            task,
        }
    }
}

/// Lifecycle of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Uninitialized,
    Ready,
    Failed,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A recognized entity span
///
/// Offsets are character positions into the original input; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub start: usize,
    pub end: usize,
    pub entity: String,
    pub score: Option<f64>,
}

/// Result of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Normalized, JSON-safe output
    pub result: serde_json::Value,

    /// Model reference that produced the output
    pub model_id: String,

    /// Task kind of the producing backend
    pub task: TaskKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_parsing() {
        assert_eq!(
            "text-classification".parse::<TaskKind>().unwrap(),
            TaskKind::TextClassification
        );
        assert_eq!("NER".parse::<TaskKind>().unwrap(), TaskKind::TokenClassification);
        assert!("summarization".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_identity_wire_shape() {
        let identity = ModelIdentity::new(
            "ner-base",
            "NER English BERT",
            "dbmdz/bert-large-cased-finetuned-conll03-english",
            TaskKind::TokenClassification,
        );

        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "key": "ner-base",
                "name": "NER English BERT",
                "model_id": "dbmdz/bert-large-cased-finetuned-conll03-english",
                "task": "token-classification",
            })
        );
    }

    #[test]
    fn test_entity_without_score_serializes_null() {
        let entity = Entity {
            start: 0,
            end: 5,
            entity: "PER".to_string(),
            score: None,
        };
        let value = serde_json::to_value(&entity).unwrap();
        assert!(value["score"].is_null());
    }
}
