//! Candle networks behind the media detector
//!
//! All three models share one small convolutional block:
//!
//! ```text
//! conv3x3(c -> 32) relu maxpool2 batchnorm
//! conv3x3(32 -> 64) relu maxpool2 batchnorm
//! flatten dense(128) relu [dropout] dense(1) sigmoid
//! ```
//!
//! The video model runs that block over every frame and feeds the
//! per-frame scores through an LSTM. Dropout is the identity at inference
//! and is not materialized.

use crate::config::MediaConfig;
use crate::loader::{get_device, inference_err, model_err};
use candle_core::{DType, Device, Tensor};
use candle_nn::rnn::{LSTMConfig, LSTM, RNN};
use candle_nn::{
    BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Linear, Module, ModuleT, VarBuilder, VarMap,
};
use std::path::Path;
use truthlens_core::{Error, Result};

pub const IMAGE_WEIGHTS: &str = "image_model.safetensors";
pub const VIDEO_WEIGHTS: &str = "video_model.safetensors";
pub const AUDIO_WEIGHTS: &str = "audio_model.safetensors";

const CONV1_CHANNELS: usize = 32;
const CONV2_CHANNELS: usize = 64;
const DENSE_UNITS: usize = 128;
const LSTM_UNITS: usize = 64;
const BATCHNORM_EPS: f64 = 1e-3;

/// Convolutional binary classifier over `(N, C, H, W)` input
pub struct ConvClassifier {
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    fc1: Linear,
    fc2: Linear,
}

impl ConvClassifier {
    pub fn new(
        vb: VarBuilder,
        in_channels: usize,
        height: usize,
        width: usize,
    ) -> candle_core::Result<Self> {
        let conv_cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let bn_cfg = BatchNormConfig {
            eps: BATCHNORM_EPS,
            ..Default::default()
        };

        let conv1 = candle_nn::conv2d(in_channels, CONV1_CHANNELS, 3, conv_cfg, vb.pp("conv1"))?;
        let bn1 = candle_nn::batch_norm(CONV1_CHANNELS, bn_cfg, vb.pp("bn1"))?;
        let conv2 = candle_nn::conv2d(CONV1_CHANNELS, CONV2_CHANNELS, 3, conv_cfg, vb.pp("conv2"))?;
        let bn2 = candle_nn::batch_norm(CONV2_CHANNELS, bn_cfg, vb.pp("bn2"))?;

        let flat = CONV2_CHANNELS * pooled_dim(height) * pooled_dim(width);
        let fc1 = candle_nn::linear(flat, DENSE_UNITS, vb.pp("fc1"))?;
        let fc2 = candle_nn::linear(DENSE_UNITS, 1, vb.pp("fc2"))?;

        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            fc1,
            fc2,
        })
    }

    /// Per-sample probabilities, shape `(N, 1)`
    pub fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.conv1.forward(xs)?.relu()?.max_pool2d(2)?;
        let xs = self.bn1.forward_t(&xs, false)?;
        let xs = self.conv2.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = self.bn2.forward_t(&xs, false)?;
        let xs = xs.flatten_from(1)?;
        let xs = self.fc1.forward(&xs)?.relu()?;
        candle_nn::ops::sigmoid(&self.fc2.forward(&xs)?)
    }
}

/// Spatial size after two 2x2 max pools
fn pooled_dim(size: usize) -> usize {
    size / 2 / 2
}

/// Frame-level CNN followed by an LSTM over time
pub struct VideoClassifier {
    frame_net: ConvClassifier,
    lstm: LSTM,
    fc1: Linear,
    fc2: Linear,
}

impl VideoClassifier {
    pub fn new(vb: VarBuilder, image_size: usize) -> candle_core::Result<Self> {
        let frame_net = ConvClassifier::new(vb.pp("frame"), 3, image_size, image_size)?;
        let lstm = candle_nn::lstm(1, LSTM_UNITS, LSTMConfig::default(), vb.pp("lstm"))?;
        let fc1 = candle_nn::linear(LSTM_UNITS, LSTM_UNITS, vb.pp("fc1"))?;
        let fc2 = candle_nn::linear(LSTM_UNITS, 1, vb.pp("fc2"))?;

        Ok(Self {
            frame_net,
            lstm,
            fc1,
            fc2,
        })
    }

    /// Score a clip of frames shaped `(T, 3, H, W)`, returns `(1, 1)`
    pub fn forward(&self, frames: &Tensor) -> candle_core::Result<Tensor> {
        let steps = frames.dim(0)?;
        let per_frame = self.frame_net.forward(frames)?.reshape((1, steps, 1))?;
        let states = self.lstm.seq(&per_frame)?;
        let last = states
            .last()
            .ok_or_else(|| candle_core::Error::Msg("empty frame sequence".to_string()))?;
        let xs = self.fc1.forward(last.h())?.relu()?;
        candle_nn::ops::sigmoid(&self.fc2.forward(&xs)?)
    }
}

/// The three media models and the variables backing them
pub struct MediaModels {
    image: ConvClassifier,
    video: VideoClassifier,
    audio: ConvClassifier,
    image_vars: VarMap,
    video_vars: VarMap,
    audio_vars: VarMap,
    device: Device,
}

impl MediaModels {
    /// Build all three models, loading weights if a directory is configured
    pub fn new(config: &MediaConfig) -> Result<Self> {
        let device = get_device(&config.device)?;

        let mut image_vars = VarMap::new();
        let mut video_vars = VarMap::new();
        let mut audio_vars = VarMap::new();

        let image = ConvClassifier::new(
            VarBuilder::from_varmap(&image_vars, DType::F32, &device),
            3,
            config.image_size,
            config.image_size,
        )
        .map_err(model_err("Failed to build image model"))?;

        let video = VideoClassifier::new(
            VarBuilder::from_varmap(&video_vars, DType::F32, &device),
            config.image_size,
        )
        .map_err(model_err("Failed to build video model"))?;

        let audio = ConvClassifier::new(
            VarBuilder::from_varmap(&audio_vars, DType::F32, &device),
            1,
            config.n_mfcc,
            config.mfcc_frames,
        )
        .map_err(model_err("Failed to build audio model"))?;

        match &config.weights_dir {
            Some(dir) => {
                load_weights(&mut image_vars, dir, IMAGE_WEIGHTS)?;
                load_weights(&mut video_vars, dir, VIDEO_WEIGHTS)?;
                load_weights(&mut audio_vars, dir, AUDIO_WEIGHTS)?;
                tracing::info!("Loaded media model weights from {}", dir.display());
            }
            None => {
                tracing::warn!(
                    "No media weights directory configured, models are randomly initialized"
                );
            }
        }

        Ok(Self {
            image,
            video,
            audio,
            image_vars,
            video_vars,
            audio_vars,
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Score a single image shaped `(1, 3, H, W)`
    pub fn score_image(&self, pixels: &Tensor) -> Result<f32> {
        let out = self
            .image
            .forward(pixels)
            .map_err(inference_err("Image model forward pass failed"))?;
        scalar(&out)
    }

    /// Score a clip shaped `(T, 3, H, W)`
    pub fn score_video(&self, frames: &Tensor) -> Result<f32> {
        let out = self
            .video
            .forward(frames)
            .map_err(inference_err("Video model forward pass failed"))?;
        scalar(&out)
    }

    /// Score MFCC features shaped `(1, 1, n_mfcc, frames)`
    pub fn score_audio(&self, features: &Tensor) -> Result<f32> {
        let out = self
            .audio
            .forward(features)
            .map_err(inference_err("Audio model forward pass failed"))?;
        scalar(&out)
    }

    /// Write all three weight files into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        for (vars, file) in [
            (&self.image_vars, IMAGE_WEIGHTS),
            (&self.video_vars, VIDEO_WEIGHTS),
            (&self.audio_vars, AUDIO_WEIGHTS),
        ] {
            let path = dir.join(file);
            vars.save(&path).map_err(|e| {
                Error::model(format!("Failed to save {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

fn load_weights(vars: &mut VarMap, dir: &Path, file: &str) -> Result<()> {
    let path = dir.join(file);
    if !path.exists() {
        return Err(Error::model(format!(
            "Weights file not found: {}",
            path.display()
        )));
    }
    vars.load(&path)
        .map_err(|e| Error::model(format!("Failed to load {}: {}", path.display(), e)))
}

fn scalar(out: &Tensor) -> Result<f32> {
    out.flatten_all()
        .and_then(|t| t.get(0))
        .and_then(|t| t.to_scalar::<f32>())
        .map_err(inference_err("Failed to read model output"))
}
