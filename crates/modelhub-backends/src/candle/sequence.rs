use super::{
    load_bert_backbone, load_tokenizer, load_var_builder, parse_json_config, HeadConfig,
    InferResult, ModelInputs,
};
use crate::pipeline::{InferencePipeline, PipelineSpec};
use candle_core::{Device, IndexOp, D};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use modelhub_core::{Error, RawValue, Result};
use std::path::Path;
use tokenizers::Tokenizer;

enum Classifier {
    Bert {
        model: BertModel,
        pooler: Option<Linear>,
        head: Linear,
    },
    Roberta(XLMRobertaForSequenceClassification),
}

/// Text classification: softmax over the head's logits, top-k labels
pub(crate) struct SequencePipeline {
    model_id: String,
    tokenizer: Tokenizer,
    classifier: Classifier,
    labels: Vec<String>,
    top_k: usize,
    device: Device,
}

impl SequencePipeline {
    pub fn load(
        spec: &PipelineSpec,
        model_path: &Path,
        head: &HeadConfig,
        device: Device,
    ) -> Result<Self> {
        let model_id = spec.model_id.as_str();
        let labels = head.labels();
        let num_labels = labels.len();

        let tokenizer = load_tokenizer(model_id, model_path, head.max_length())?;
        let vb = load_var_builder(model_id, model_path, &device)?;
        let config_path = model_path.join("config.json");

        let classifier = if head.is_roberta() {
            let config: XlmRobertaConfig = parse_json_config(model_id, &config_path)?;
            let model = XLMRobertaForSequenceClassification::new(num_labels, &config, vb)
                .map_err(|e| {
                    Error::init(model_id, format!("Failed to load RoBERTa classifier: {}", e))
                })?;
            Classifier::Roberta(model)
        } else {
            let config: BertConfig = parse_json_config(model_id, &config_path)?;
            let (model, prefix) = load_bert_backbone(model_id, &vb, &config)?;

            let pooler_vb = if prefix.is_empty() {
                vb.pp("pooler.dense")
            } else {
                vb.pp(prefix).pp("pooler.dense")
            };
            let pooler = candle_nn::linear(head.hidden_size, head.hidden_size, pooler_vb).ok();
            if pooler.is_none() {
                tracing::debug!("{} has no pooler; classifying the [CLS] state directly", model_id);
            }

            let head = candle_nn::linear(head.hidden_size, num_labels, vb.pp("classifier"))
                .map_err(|e| {
                    Error::init(model_id, format!("Failed to load classification head: {}", e))
                })?;

            Classifier::Bert {
                model,
                pooler,
                head,
            }
        };

        tracing::info!(
            "Loaded sequence classifier {} with {} labels: {:?}",
            model_id,
            num_labels,
            labels
        );

        Ok(Self {
            model_id: spec.model_id.clone(),
            tokenizer,
            classifier,
            labels,
            top_k: spec.top_k,
            device,
        })
    }

    fn probabilities(&self, text: &str) -> InferResult<Vec<f32>> {
        let encoding = self.tokenizer.encode(text, true)?;
        let inputs = ModelInputs::new(&encoding, &self.device)?;

        let logits = match &self.classifier {
            Classifier::Bert {
                model,
                pooler,
                head,
            } => {
                let hidden = model.forward(
                    &inputs.input_ids,
                    &inputs.token_type_ids,
                    Some(&inputs.attention_mask),
                )?;
                let cls = hidden.i((.., 0))?;
                let pooled = match pooler {
                    Some(pooler) => pooler.forward(&cls)?.tanh()?,
                    None => cls,
                };
                head.forward(&pooled)?
            }
            Classifier::Roberta(model) => model.forward(
                &inputs.input_ids,
                &inputs.attention_mask,
                &inputs.token_type_ids,
            )?,
        };

        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;
        Ok(probs)
    }
}

impl InferencePipeline for SequencePipeline {
    fn run(&self, text: &str) -> Result<RawValue> {
        let probs = self
            .probabilities(text)
            .map_err(|e| Error::predict(&self.model_id, e))?;
        Ok(rank_labels(&self.labels, &probs, self.top_k))
    }
}

/// The `top_k` most likely labels, highest first, as `{label, score}` maps
fn rank_labels(labels: &[String], probs: &[f32], top_k: usize) -> RawValue {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    RawValue::Seq(
        ranked
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| {
                let label = labels
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("LABEL_{}", idx));
                RawValue::map([("label", RawValue::from(label)), ("score", RawValue::F32(score))])
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_labels() {
        let labels: Vec<String> = ["anger", "joy", "sadness"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let ranked = rank_labels(&labels, &[0.25, 0.5, 0.25], 2);

        let RawValue::Seq(items) = ranked else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("label").and_then(RawValue::as_str), Some("joy"));
        assert_eq!(items[0].get("score").and_then(RawValue::as_f64), Some(0.5));
    }

    #[test]
    fn test_rank_labels_fills_missing_names() {
        let ranked = rank_labels(&[], &[0.75, 0.25], 1);
        let RawValue::Seq(items) = ranked else {
            panic!("expected a list");
        };
        assert_eq!(items[0].get("label").and_then(RawValue::as_str), Some("LABEL_0"));
    }
}
