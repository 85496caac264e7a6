//! Model catalog configuration structures

use modelhub_core::{Error, Result, TaskKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Catalog of models to register, in listing order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_version")]
    pub version: String,

    pub models: Vec<ModelEntry>,
}

/// Configuration for a single model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Stable lookup key
    pub key: String,

    /// Display name
    pub name: String,

    /// Hub repository id or other opaque model reference
    pub model_id: String,

    /// Task kind
    pub task: TaskKind,

    /// Pinned revision
    #[serde(default)]
    pub revision: Option<String>,

    /// Ranked candidates returned by classification models
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_top_k() -> usize {
    1
}

impl CatalogConfig {
    /// Load a catalog from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse a catalog from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let catalog: CatalogConfig = serde_yaml::from_str(contents)?;
        Ok(catalog)
    }

    /// Get a model entry by key
    pub fn get_model(&self, key: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.key == key)
    }
}

/// Device to run inference on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSpec {
    /// CUDA when available, otherwise CPU
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("invalid device index in '{}'", s)))?;
                (kind.to_string(), idx)
            }
            None => (s.clone(), 0),
        };

        match kind.as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            other => Err(Error::config(format!("unknown device '{}'", other))),
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(idx) => write!(f, "cuda:{}", idx),
            Self::Metal(idx) => write!(f, "metal:{}", idx),
        }
    }
}

impl Serialize for DeviceSpec {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceSpec {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let yaml = r#"
version: "1.0"
models:
  - key: sentiment-bert
    name: "Sentiment Analysis BERT"
    model_id: "PaoloPangallo/Sentiment_analisys_bert"
    task: text-classification
  - key: ner-base
    name: "NER English BERT"
    model_id: "dbmdz/bert-large-cased-finetuned-conll03-english"
    task: ner
    revision: main
  - key: emotion-bert
    name: "Emotion Classification"
    model_id: "j-hartmann/emotion-english-distilroberta-base"
    task: sentiment-analysis
    top_k: 3
"#;

        let catalog = CatalogConfig::from_yaml(yaml).unwrap();
        assert_eq!(catalog.models.len(), 3);
        assert_eq!(catalog.models[0].key, "sentiment-bert");
        assert_eq!(catalog.models[0].top_k, 1);

        let ner = catalog.get_model("ner-base").unwrap();
        assert_eq!(ner.task, TaskKind::TokenClassification);
        assert_eq!(ner.revision.as_deref(), Some("main"));

        let emotion = catalog.get_model("emotion-bert").unwrap();
        assert_eq!(emotion.task, TaskKind::TextClassification);
        assert_eq!(emotion.top_k, 3);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let yaml = r#"
models:
  - key: summarizer
    name: "Summarizer"
    model_id: "org/sum"
    task: summarization
"#;
        assert!(CatalogConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "models:\n  - key: a\n    name: A\n    model_id: org/a\n    \
             task: token-classification\n",
        )
        .unwrap();

        let catalog = CatalogConfig::from_file(&path).unwrap();
        assert_eq!(catalog.version, "1.0");
        assert_eq!(catalog.models[0].model_id, "org/a");

        assert!(CatalogConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_device_spec_parsing() {
        assert_eq!("auto".parse::<DeviceSpec>().unwrap(), DeviceSpec::Auto);
        assert_eq!("CPU".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cpu);
        assert_eq!("cuda:1".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cuda(1));
        assert_eq!("mps".parse::<DeviceSpec>().unwrap(), DeviceSpec::Metal(0));
        assert!("tpu".parse::<DeviceSpec>().is_err());
        assert!("cuda:x".parse::<DeviceSpec>().is_err());
        assert_eq!(DeviceSpec::Cuda(2).to_string(), "cuda:2");
    }
}
