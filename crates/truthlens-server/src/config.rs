//! Service configuration

use crate::cli::ServeArgs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use truthlens_detectors::{MediaConfig, ModelSource, TextConfig};

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub text: TextConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl AppConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn from_file(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config = serde_yaml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse {}: {}", config_path.display(), e)
        })?;
        Ok(config)
    }

    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &Path, args: &ServeArgs) -> anyhow::Result<Self> {
        let mut config = Self::from_file(config_path)?;
        config.apply_overrides(args);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &ServeArgs) {
        if let Some(listen) = &args.listen {
            self.server.listen = listen.clone();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(upload_dir) = &args.upload_dir {
            self.server.upload_dir = upload_dir.clone();
        }

        if let Some(weights_dir) = &args.weights_dir {
            self.media.weights_dir = Some(weights_dir.clone());
        }

        if let Some(model) = &args.text_model {
            self.text.source = text_model_source(model);
        }

        if let Some(seed) = args.seed {
            self.scoring.seed = Some(seed);
        }
    }
}

/// An existing directory is a local checkpoint; anything else is a hub repo
fn text_model_source(model: &str) -> ModelSource {
    let path = PathBuf::from(model);
    if path.is_dir() {
        ModelSource::Local { path }
    } else {
        ModelSource::HuggingFace {
            repo: model.to_string(),
            revision: "main".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory uploads are staged in while being analyzed
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            cors: CorsConfig::default(),
        }
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Auxiliary sub-score generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Seed for reproducible sub-scores; unseeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}
