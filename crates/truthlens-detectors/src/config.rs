//! Configuration for detectors and model loading

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Media model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Device to run on (cpu, cuda, mps)
    #[serde(default = "default_device")]
    pub device: String,

    /// Square side length frames are resized to
    #[serde(default = "default_image_size")]
    pub image_size: usize,

    /// Maximum number of frames decoded from a video
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,

    /// Sample rate audio is resampled to before feature extraction
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of MFCC coefficients per frame
    #[serde(default = "default_n_mfcc")]
    pub n_mfcc: usize,

    /// Fixed number of MFCC time frames (padded or truncated)
    #[serde(default = "default_mfcc_frames")]
    pub mfcc_frames: usize,

    /// ffmpeg binary used for non-GIF video containers
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Directory holding pretrained weights; random init when unset
    #[serde(default)]
    pub weights_dir: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            image_size: default_image_size(),
            frame_count: default_frame_count(),
            sample_rate: default_sample_rate(),
            n_mfcc: default_n_mfcc(),
            mfcc_frames: default_mfcc_frames(),
            ffmpeg_path: default_ffmpeg_path(),
            weights_dir: None,
        }
    }
}

/// Text model source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from local filesystem
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: "bert-base-uncased".to_string(),
            revision: default_revision(),
        }
    }
}

/// Text classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Where the BERT checkpoint comes from
    #[serde(default)]
    pub source: ModelSource,

    /// Device to run on (cpu, cuda, mps)
    #[serde(default = "default_device")]
    pub device: String,

    /// Fixed sequence length (truncate + pad)
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Keywords reported as suspicious phrases, in report order
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::default(),
            device: default_device(),
            max_length: default_max_length(),
            keywords: default_keywords(),
        }
    }
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_image_size() -> usize {
    224
}

fn default_frame_count() -> usize {
    30
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_n_mfcc() -> usize {
    40
}

fn default_mfcc_frames() -> usize {
    216
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_max_length() -> usize {
    128
}

/// Keywords scanned for by default
pub fn default_keywords() -> Vec<String> {
    ["fake", "hoax", "conspiracy", "fabricated", "misleading"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
