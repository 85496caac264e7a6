use super::{
    argmax, load_bert_backbone, load_tokenizer, load_var_builder, parse_json_config, HeadConfig,
    InferResult, ModelInputs,
};
use crate::aggregation::{aggregate_simple, TokenPrediction};
use crate::pipeline::{InferencePipeline, PipelineSpec};
use candle_core::{Device, D};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use modelhub_core::{Error, RawValue, Result};
use std::path::Path;
use tokenizers::Tokenizer;

/// Named-entity recognition over a BERT encoder with a per-token head
pub(crate) struct TokenPipeline {
    model_id: String,
    tokenizer: Tokenizer,
    model: BertModel,
    head: Linear,
    labels: Vec<String>,
    device: Device,
}

impl TokenPipeline {
    pub fn load(
        spec: &PipelineSpec,
        model_path: &Path,
        head: &HeadConfig,
        device: Device,
    ) -> Result<Self> {
        let model_id = spec.model_id.as_str();
        if head.is_roberta() {
            return Err(Error::init(
                model_id,
                format!(
                    "token classification is not supported for model_type '{}'",
                    head.model_type.as_deref().unwrap_or_default()
                ),
            ));
        }

        let labels = head.labels();
        let tokenizer = load_tokenizer(model_id, model_path, head.max_length())?;
        let vb = load_var_builder(model_id, model_path, &device)?;

        let config: BertConfig = parse_json_config(model_id, &model_path.join("config.json"))?;
        let (model, _) = load_bert_backbone(model_id, &vb, &config)?;
        let classifier = candle_nn::linear(head.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| Error::init(model_id, format!("Failed to load token head: {}", e)))?;

        tracing::info!(
            "Loaded token classifier {} with labels: {:?}",
            model_id,
            labels
        );

        Ok(Self {
            model_id: spec.model_id.clone(),
            tokenizer,
            model,
            head: classifier,
            labels,
            device,
        })
    }

    /// Best label per non-special token, with character offsets
    fn token_predictions(&self, text: &str) -> InferResult<Vec<TokenPrediction>> {
        let encoding = self.tokenizer.encode_char_offsets(text, true)?;
        let inputs = ModelInputs::new(&encoding, &self.device)?;

        let hidden = self.model.forward(
            &inputs.input_ids,
            &inputs.token_type_ids,
            Some(&inputs.attention_mask),
        )?;
        let logits = self.head.forward(&hidden)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec2::<f32>()?;

        let special = encoding.get_special_tokens_mask();
        let offsets = encoding.get_offsets();

        let predictions = probs
            .iter()
            .enumerate()
            .filter(|(idx, _)| special.get(*idx).copied().unwrap_or(1) == 0)
            .filter_map(|(idx, row)| {
                let (start, end) = *offsets.get(idx)?;
                if end <= start {
                    return None;
                }
                let (class, score) = argmax(row)?;
                let label = self
                    .labels
                    .get(class)
                    .cloned()
                    .unwrap_or_else(|| format!("LABEL_{}", class));
                Some(TokenPrediction {
                    label,
                    score,
                    start,
                    end,
                })
            })
            .collect();

        Ok(predictions)
    }
}

impl InferencePipeline for TokenPipeline {
    fn run(&self, text: &str) -> Result<RawValue> {
        let tokens = self
            .token_predictions(text)
            .map_err(|e| Error::predict(&self.model_id, e))?;

        let groups = aggregate_simple(text, &tokens);
        Ok(RawValue::Seq(groups.into_iter().map(RawValue::from).collect()))
    }
}
