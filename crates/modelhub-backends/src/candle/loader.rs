use super::{get_device, parse_json_config, sequence, token, HeadConfig};
use crate::model_config::DeviceSpec;
use crate::pipeline::{InferencePipeline, PipelineLoader, PipelineSpec};
use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use modelhub_core::{Error, Result, TaskKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loads pipelines from the HuggingFace Hub (or a local model directory) and
/// runs them with Candle.
pub struct CandleLoader {
    token: Option<String>,
    cache_dir: PathBuf,
    device: DeviceSpec,
}

impl CandleLoader {
    pub fn new() -> Self {
        let cache_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cache/huggingface/hub");

        Self {
            token: None,
            cache_dir,
            device: DeviceSpec::Auto,
        }
    }

    /// Access token for gated or private repositories
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_device(mut self, device: DeviceSpec) -> Self {
        self.device = device;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn device(&self) -> DeviceSpec {
        self.device
    }

    fn api(&self) -> Result<Api> {
        std::fs::create_dir_all(&self.cache_dir).ok();

        ApiBuilder::new()
            .with_token(self.token.clone())
            .with_cache_dir(self.cache_dir.clone())
            .with_progress(false)
            .build()
            .map_err(|e| Error::config(format!("Failed to initialize HuggingFace API: {}", e)))
    }

    /// Resolve a model reference to a directory holding its files
    fn resolve_model_path(&self, spec: &PipelineSpec) -> Result<PathBuf> {
        let local = Path::new(&spec.model_id);
        if local.is_dir() {
            tracing::debug!("Using local model directory {}", local.display());
            return Ok(local.to_path_buf());
        }
        self.download_from_huggingface(spec)
    }

    fn download_from_huggingface(&self, spec: &PipelineSpec) -> Result<PathBuf> {
        let model_id = spec.model_id.as_str();
        let revision = spec.revision.clone().unwrap_or_else(|| "main".to_string());
        tracing::info!("Fetching {} (revision {}) from HuggingFace", model_id, revision);

        let api = self.api()?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision,
        ));

        let config_path = repo
            .get("config.json")
            .map_err(|e| Error::init(model_id, format!("Failed to download config.json: {}", e)))?;

        let found_weights = ["model.safetensors", "pytorch_model.bin"]
            .iter()
            .any(|file| match repo.get(file) {
                Ok(_) => {
                    tracing::debug!("Found weight file: {}", file);
                    true
                }
                Err(_) => false,
            });
        if !found_weights {
            return Err(Error::init(
                model_id,
                "No model weights found (tried model.safetensors, pytorch_model.bin)",
            ));
        }

        let mut found_tokenizer = false;
        for file in ["tokenizer.json", "vocab.txt", "tokenizer_config.json"] {
            match repo.get(file) {
                Ok(_) => {
                    tracing::debug!("Found tokenizer file: {}", file);
                    if file != "tokenizer_config.json" {
                        found_tokenizer = true;
                    }
                }
                Err(_) => tracing::debug!("File not found: {}", file),
            }
        }
        if !found_tokenizer {
            return Err(Error::init(
                model_id,
                "No tokenizer found (tried tokenizer.json, vocab.txt)",
            ));
        }

        let model_dir = config_path
            .parent()
            .ok_or_else(|| Error::init(model_id, "Invalid cache path"))?;

        tracing::debug!("Model available at: {}", model_dir.display());
        Ok(model_dir.to_path_buf())
    }
}

impl Default for CandleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CandleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleLoader")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("cache_dir", &self.cache_dir)
            .field("device", &self.device)
            .finish()
    }
}

impl PipelineLoader for CandleLoader {
    fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn InferencePipeline>> {
        let model_path = self.resolve_model_path(spec)?;
        let head: HeadConfig = parse_json_config(&spec.model_id, &model_path.join("config.json"))?;
        let device = get_device(self.device)?;

        tracing::debug!(
            "Building {} pipeline for {} on {:?}",
            spec.task,
            spec.model_id,
            device
        );

        let pipeline: Arc<dyn InferencePipeline> = match spec.task {
            TaskKind::TextClassification => Arc::new(sequence::SequencePipeline::load(
                spec,
                &model_path,
                &head,
                device,
            )?),
            TaskKind::TokenClassification => Arc::new(token::TokenPipeline::load(
                spec,
                &model_path,
                &head,
                device,
            )?),
        };
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted_in_debug() {
        let loader = CandleLoader::new().with_token(Some("hf_secret".to_string()));
        let debug = format!("{:?}", loader);
        assert!(!debug.contains("hf_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let loader = CandleLoader::new().with_token(Some(String::new()));
        assert!(loader.token.is_none());
    }

    #[test]
    fn test_local_directory_without_config_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let spec = PipelineSpec::new(
            dir.path().to_string_lossy().to_string(),
            TaskKind::TextClassification,
        );

        let loader = CandleLoader::new().with_device(DeviceSpec::Cpu);
        let err = loader.load(&spec).err().unwrap();
        assert!(matches!(err, Error::Init { .. }));
    }
}
