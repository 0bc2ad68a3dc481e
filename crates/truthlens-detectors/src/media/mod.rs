//! Media deepfake detection
//!
//! [`CandleMediaDetector`] decodes an uploaded file according to its
//! declared kind and returns the model's score in `[0, 1]`. Decoding and
//! forward passes run on the blocking pool; video frame extraction may
//! shell out to ffmpeg.

pub mod audio;
pub mod image;
pub mod mfcc;
pub mod models;
pub mod video;

pub use models::MediaModels;

use crate::classifier::MediaDetector;
use crate::config::MediaConfig;
use crate::loader::inference_err;
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use mfcc::MfccExtractor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use truthlens_core::{Error, MediaKind, Result};

/// Media detector backed by the candle image, video, and audio models
pub struct CandleMediaDetector {
    inner: Arc<Inner>,
}

struct Inner {
    models: MediaModels,
    mfcc: MfccExtractor,
    config: MediaConfig,
}

impl CandleMediaDetector {
    pub fn new(config: MediaConfig) -> Result<Self> {
        let models = MediaModels::new(&config)?;
        let mfcc = MfccExtractor::new(config.sample_rate, config.n_mfcc);

        tracing::info!(
            image_size = config.image_size,
            frame_count = config.frame_count,
            sample_rate = config.sample_rate,
            "Media detector ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                models,
                mfcc,
                config,
            }),
        })
    }

    async fn detect_video(&self, path: &Path) -> Result<f32> {
        let frames = video::extract_frames(path, &self.inner.config).await?;
        let inner = Arc::clone(&self.inner);
        run_blocking(move || {
            let tensor = image::frames_to_tensor(&frames, inner.models.device())?;
            inner.models.score_video(&tensor)
        })
        .await
    }
}

impl Inner {
    fn score_image(&self, bytes: &[u8]) -> Result<f32> {
        let tensor =
            image::preprocess_image(bytes, self.config.image_size, self.models.device())?;
        self.models.score_image(&tensor)
    }

    fn score_audio(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<f32> {
        let tensor = self.audio_features(bytes, extension)?;
        self.models.score_audio(&tensor)
    }

    /// Decode, resample, and compute fixed-size MFCC features
    fn audio_features(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<Tensor> {
        let pcm = audio::decode(bytes, extension)?;
        if pcm.samples.is_empty() {
            return Err(Error::preprocess("Audio contains no samples"));
        }

        let samples = audio::resample(&pcm.samples, pcm.sample_rate, self.config.sample_rate);
        let coefficients = self.mfcc.compute(&samples);
        let frames = self.config.mfcc_frames;
        let data = mfcc::fixed_frames(&coefficients, frames);

        mfcc_tensor(data, self.mfcc.n_mfcc(), frames, self.models.device())
    }
}

fn mfcc_tensor(data: Vec<f32>, n_mfcc: usize, frames: usize, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(data, (1, 1, n_mfcc, frames), device)
        .map_err(inference_err("Failed to create MFCC tensor"))
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))?
}

#[async_trait]
impl MediaDetector for CandleMediaDetector {
    async fn detect(&self, kind: MediaKind, path: &Path) -> Result<f32> {
        let start = Instant::now();

        let score = match kind {
            MediaKind::Image => {
                let bytes = tokio::fs::read(path).await?;
                let inner = Arc::clone(&self.inner);
                run_blocking(move || inner.score_image(&bytes)).await?
            }
            MediaKind::Video => self.detect_video(path).await?,
            MediaKind::Audio => {
                let bytes = tokio::fs::read(path).await?;
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                let inner = Arc::clone(&self.inner);
                run_blocking(move || inner.score_audio(bytes, extension.as_deref())).await?
            }
        };

        tracing::debug!(
            kind = %kind,
            score,
            latency_us = start.elapsed().as_micros() as u64,
            "Media scored"
        );

        Ok(score)
    }

    fn name(&self) -> &str {
        "candle-media"
    }
}
