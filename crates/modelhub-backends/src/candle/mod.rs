//! Candle-backed pipelines for HuggingFace Hub models
//!
//! Supported architectures:
//! - BERT sequence classification (optional pooler + linear head)
//! - RoBERTa / XLM-RoBERTa sequence classification
//! - BERT token classification with "simple" entity grouping

mod loader;
mod sequence;
mod token;

pub use loader::CandleLoader;

use crate::model_config::DeviceSpec;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use modelhub_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::{Encoding, Tokenizer, TruncationParams};

/// Error type for the inference hot path; mapped once at the pipeline boundary
pub(crate) type InferResult<T> =
    std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Upper bound on sequence length, whatever the model advertises
const MAX_SEQUENCE_LENGTH: usize = 512;

/// The subset of `config.json` shared by every supported architecture
#[derive(Debug, Deserialize)]
pub(crate) struct HeadConfig {
    #[serde(default)]
    pub model_type: Option<String>,

    pub hidden_size: usize,

    #[serde(default)]
    pub num_labels: Option<usize>,

    #[serde(default)]
    pub id2label: HashMap<String, String>,

    #[serde(default)]
    pub max_position_embeddings: Option<usize>,
}

impl HeadConfig {
    /// Labels ordered by class index
    pub fn labels(&self) -> Vec<String> {
        let mut indexed: Vec<(usize, &String)> = self
            .id2label
            .iter()
            .filter_map(|(idx, label)| idx.parse::<usize>().ok().map(|idx| (idx, label)))
            .collect();
        indexed.sort_by_key(|(idx, _)| *idx);

        if indexed.is_empty() {
            let n = self.num_labels.unwrap_or(2);
            return (0..n).map(|idx| format!("LABEL_{}", idx)).collect();
        }
        indexed.into_iter().map(|(_, label)| label.clone()).collect()
    }

    pub fn is_roberta(&self) -> bool {
        matches!(
            self.model_type.as_deref(),
            Some("roberta") | Some("xlm-roberta") | Some("camembert")
        )
    }

    /// Usable token count, accounting for RoBERTa's position offset
    pub fn max_length(&self) -> usize {
        let positions = self.max_position_embeddings.unwrap_or(MAX_SEQUENCE_LENGTH);
        let usable = if self.is_roberta() {
            positions.saturating_sub(2)
        } else {
            positions
        };
        usable.clamp(1, MAX_SEQUENCE_LENGTH)
    }
}

pub(crate) fn get_device(spec: DeviceSpec) -> Result<Device> {
    match spec {
        DeviceSpec::Auto => Device::cuda_if_available(0)
            .map_err(|e| Error::config(format!("Failed to select device: {}", e))),
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::config(format!("Failed to initialize CUDA: {}", e))),
        DeviceSpec::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::config(format!("Failed to initialize Metal: {}", e))),
    }
}

pub(crate) fn parse_json_config<T: DeserializeOwned>(
    model_id: &str,
    config_path: &Path,
) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::init(
            model_id,
            format!("Failed to read config {}: {}", config_path.display(), e),
        )
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::init(
            model_id,
            format!("Failed to parse config {}: {}", config_path.display(), e),
        )
    })
}

pub(crate) fn load_var_builder(
    model_id: &str,
    model_path: &Path,
    device: &Device,
) -> Result<VarBuilder<'static>> {
    let safetensors = model_path.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the file is opened read-only from the model cache and not mutated while mapped
        return unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)
        }
        .map_err(|e| Error::init(model_id, format!("Failed to load weights: {}", e)));
    }

    let pth = model_path.join("pytorch_model.bin");
    if pth.exists() {
        tracing::debug!("Loading PyTorch weights for {}", model_id);
        return VarBuilder::from_pth(&pth, DType::F32, device)
            .map_err(|e| Error::init(model_id, format!("Failed to load weights: {}", e)));
    }

    Err(Error::init(
        model_id,
        format!(
            "No model weights found in {} (tried model.safetensors, pytorch_model.bin)",
            model_path.display()
        ),
    ))
}

/// Load a BERT encoder, trying the usual weight prefixes
pub(crate) fn load_bert_backbone(
    model_id: &str,
    vb: &VarBuilder,
    config: &BertConfig,
) -> Result<(BertModel, &'static str)> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                tracing::debug!(
                    "Loaded BERT backbone from '{}'",
                    if prefix.is_empty() { "<root>" } else { prefix }
                );
                return Ok((model, prefix));
            }
            Err(e) => errors.push(format!(
                "{}: {}",
                if prefix.is_empty() { "<root>" } else { prefix },
                e
            )),
        }
    }

    Err(Error::init(
        model_id,
        format!(
            "Failed to load BERT backbone with tried prefixes [{}]",
            errors.join(" | ")
        ),
    ))
}

/// Load the tokenizer and cap its output at `max_length` tokens
pub(crate) fn load_tokenizer(
    model_id: &str,
    model_path: &Path,
    max_length: usize,
) -> Result<Tokenizer> {
    let mut tokenizer = read_tokenizer(model_id, model_path)?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::init(model_id, format!("Failed to configure truncation: {}", e)))?;
    Ok(tokenizer)
}

fn read_tokenizer(model_id: &str, model_path: &Path) -> Result<Tokenizer> {
    let tokenizer_json_path = model_path.join("tokenizer.json");
    if tokenizer_json_path.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json_path)
            .map_err(|e| Error::init(model_id, format!("Failed to load tokenizer.json: {}", e)));
    }

    let vocab_path = model_path.join("vocab.txt");
    if vocab_path.exists() {
        tracing::debug!("Building tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let lowercase = read_do_lower_case(&model_path.join("tokenizer_config.json"));

        let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| Error::init(model_id, format!("Failed to build WordPiece model: {}", e)))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .map(|id| (token.to_string(), id))
                .ok_or_else(|| Error::init(model_id, format!("vocab.txt has no {} token", token)))
        };
        let sep = special("[SEP]")?;
        let cls = special("[CLS]")?;

        tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(sep, cls)));

        return Ok(tokenizer);
    }

    Err(Error::init(
        model_id,
        format!(
            "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
            model_path.display()
        ),
    ))
}

fn read_do_lower_case(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
        .and_then(|v| v.get("do_lower_case").and_then(|b| b.as_bool()))
        .unwrap_or(true)
}

/// Batch-of-one input tensors for an encoding
pub(crate) struct ModelInputs {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

impl ModelInputs {
    pub fn new(encoding: &Encoding, device: &Device) -> candle_core::Result<Self> {
        Ok(Self {
            input_ids: Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?,
            token_type_ids: Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?,
            attention_mask: Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?,
        })
    }
}

/// Index and value of the largest probability
pub(crate) fn argmax(probs: &[f32]) -> Option<(usize, f32)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}
