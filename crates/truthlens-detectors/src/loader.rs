//! Model loading helpers shared by the media and text detectors

use crate::config::ModelSource;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, VarBuilder};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use truthlens_core::{Error, Result};

/// Resolve a device string (cpu, cuda, mps) to a candle device
pub fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::config(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::config(format!("Failed to initialize Metal: {}", e))),
        "cpu" => Ok(Device::Cpu),
        other => {
            tracing::warn!("Unknown device '{}', falling back to CPU", other);
            Ok(Device::Cpu)
        }
    }
}

/// Map a candle error into an inference error with context
pub(crate) fn inference_err(context: &'static str) -> impl FnOnce(candle_core::Error) -> Error {
    move |e| Error::inference(format!("{}: {}", context, e))
}

/// Map a candle error into a model construction error with context
pub(crate) fn model_err(context: &'static str) -> impl FnOnce(candle_core::Error) -> Error {
    move |e| Error::model(format!("{}: {}", context, e))
}

/// Resolve a model source to a local directory, downloading if needed
pub fn resolve_model_path(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(Error::model(format!(
                    "Model path does not exist: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo, revision } => download_from_huggingface(repo, revision),
    }
}

/// Download config, tokenizer, and weights from HuggingFace Hub
fn download_from_huggingface(repo: &str, revision: &str) -> Result<PathBuf> {
    tracing::info!("Downloading model from HuggingFace: {} @ {}", repo, revision);

    let api = hf_hub::api::sync::Api::new().map_err(|e| {
        Error::model(format!("Failed to initialize HuggingFace API: {}", e))
    })?;

    let repo_obj = api.repo(hf_hub::Repo::with_revision(
        repo.to_string(),
        hf_hub::RepoType::Model,
        revision.to_string(),
    ));

    for file in ["tokenizer.json", "model.safetensors"] {
        tracing::debug!("Downloading {}", file);
        repo_obj
            .get(file)
            .map_err(|e| Error::model(format!("Failed to download {}: {}", file, e)))?;
    }

    let config_path = repo_obj
        .get("config.json")
        .map_err(|e| Error::model(format!("Failed to download config.json: {}", e)))?;

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::model("Invalid cache path"))?;

    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir.to_path_buf())
}

/// Parse a JSON model config file
pub fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

/// Memory-map `model.safetensors` from a model directory
pub fn load_var_builder(model_path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::model(format!(
            "model.safetensors not found in {}",
            model_path.display()
        )));
    }

    // SAFETY: the weights file is not modified while mapped
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::model(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}

/// Load `tokenizer.json` from a model directory
pub fn load_tokenizer(model_path: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_path.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        Error::model(format!(
            "Failed to load tokenizer {}: {}",
            tokenizer_path.display(),
            e
        ))
    })
}

/// Load a linear layer from the first prefix that has one
pub fn load_optional_linear(
    vb: &VarBuilder,
    in_dim: usize,
    out_dim: usize,
    prefixes: &[&str],
) -> Option<Linear> {
    prefixes.iter().find_map(|prefix| {
        let layer = candle_nn::linear(in_dim, out_dim, vb.pp(*prefix)).ok()?;
        tracing::info!(
            "Loaded linear layer from '{}' ({} -> {})",
            prefix,
            in_dim,
            out_dim
        );
        Some(layer)
    })
}

/// Load the sequence classification head, or initialize one randomly
///
/// Base checkpoints such as `bert-base-uncased` ship without a head.
pub fn load_classification_head(
    vb: &VarBuilder,
    hidden_size: usize,
    num_labels: usize,
) -> Result<Linear> {
    if let Some(linear) = load_optional_linear(vb, hidden_size, num_labels, &["classifier", "score"])
    {
        return Ok(linear);
    }

    tracing::warn!(
        "No pre-trained classification head found, initializing random weights. \
         Model should be fine-tuned before use."
    );

    let weight = Tensor::randn(0f32, 0.02, (num_labels, hidden_size), vb.device())
        .map_err(model_err("Failed to init head weights"))?;
    let bias = Tensor::zeros((num_labels,), DType::F32, vb.device())
        .map_err(model_err("Failed to init head bias"))?;

    Ok(Linear::new(weight, Some(bias)))
}
