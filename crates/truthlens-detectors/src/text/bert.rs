//! BERT sequence classifier for fake-news detection

use crate::classifier::{ClassificationResult, Classifier};
use crate::config::{ModelSource, TextConfig};
use crate::loader::{
    get_device, inference_err, load_classification_head, load_optional_linear, load_tokenizer,
    load_var_builder, parse_json_config, resolve_model_path,
};
use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use truthlens_core::{Error, Result};

/// Number of output classes: REAL, FAKE
const NUM_LABELS: usize = 2;

/// BERT backbone + pooler + two-way classification head
pub struct BertTextClassifier {
    name: String,
    inner: Arc<BertInner>,
}

struct BertInner {
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
}

impl BertTextClassifier {
    /// Resolve the configured checkpoint and build the classifier
    pub fn load(config: &TextConfig) -> Result<Self> {
        let model_path = resolve_model_path(&config.source)?;
        tracing::info!("Loading BERT classifier from {}", model_path.display());

        let mut tokenizer = load_tokenizer(&model_path)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::model(format!("Failed to configure truncation: {}", e)))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(config.max_length),
            ..Default::default()
        }));

        let bert_config: BertConfig = parse_json_config(&model_path.join("config.json"))?;
        let hidden_size = bert_config.hidden_size;

        let device = get_device(&config.device)?;
        let vb = load_var_builder(&model_path, &device)?;

        let model = load_bert_backbone(&vb, &bert_config)?;
        let pooler = load_optional_linear(
            &vb,
            hidden_size,
            hidden_size,
            &["bert.pooler.dense", "pooler.dense"],
        );
        let classifier = load_classification_head(&vb, hidden_size, NUM_LABELS)?;

        let name = match &config.source {
            ModelSource::HuggingFace { repo, .. } => repo.clone(),
            ModelSource::Local { path } => path.display().to_string(),
        };

        tracing::info!(
            "Successfully loaded BERT classifier '{}' (pooler: {})",
            name,
            pooler.is_some()
        );

        Ok(Self {
            name,
            inner: Arc::new(BertInner {
                tokenizer,
                model,
                pooler,
                classifier,
                device,
            }),
        })
    }
}

impl BertInner {
    fn probabilities(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::inference(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference_err("Failed to create input tensor"))?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference_err("Failed to create token type tensor"))?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference_err("Failed to create attention mask"))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference_err("Model forward pass failed"))?;

        let cls_embedding = hidden_states
            .i((.., 0, ..))
            .map_err(inference_err("Failed to get CLS token"))?;

        let pooled = match &self.pooler {
            Some(pooler) => pooler
                .forward(&cls_embedding)
                .and_then(|t| t.tanh())
                .map_err(inference_err("Pooler failed"))?,
            None => cls_embedding,
        };

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(inference_err("Classification head failed"))?;

        candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(inference_err("Softmax failed"))
    }
}

#[async_trait]
impl Classifier for BertTextClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        let probs = tokio::task::spawn_blocking(move || inner.probabilities(&text))
            .await
            .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))??;

        let mut result = ClassificationResult::from_probabilities(&probs);
        result.metadata.model = Some(self.name.clone());
        result.latency_us = start.elapsed().as_micros() as u64;
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn load_bert_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<BertModel> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };
                tracing::info!("Loaded BERT backbone from '{}'", effective_prefix);
                return Ok(model);
            }
            Err(e) => {
                errors.push(format!(
                    "{}: {}",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    e
                ));
            }
        }
    }

    Err(Error::model(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_missing_local_model() {
        let config = TextConfig {
            source: ModelSource::Local {
                path: PathBuf::from("./models/does-not-exist"),
            },
            ..Default::default()
        };

        let err = BertTextClassifier::load(&config).err().unwrap();
        assert_eq!(err.kind(), "model");
    }
}
