//! Shared application state

use crate::config::AppConfig;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;
use truthlens_detectors::{
    BertTextClassifier, CandleMediaDetector, KeywordScanner, MediaDetector, ScoreSource,
    SeededSource, TextDetector, ThreadRngSource,
};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,

    /// Image, video, and audio models
    pub media: Arc<dyn MediaDetector>,

    /// Text classifier plus keyword scan
    pub text: TextDetector,

    /// Random draws for the auxiliary sub-scores
    pub scores: Arc<dyn ScoreSource>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Build every detector from configuration
    pub fn new(config: AppConfig, metrics_handle: PrometheusHandle) -> Result<Self> {
        info!("Initializing application state");

        info!("Building media models");
        let media = CandleMediaDetector::new(config.media.clone())?;

        info!("Loading text classifier");
        let classifier = BertTextClassifier::load(&config.text)?;
        let scanner = KeywordScanner::new(&config.text.keywords)?;
        info!(
            "Keyword scan covers {} keywords",
            scanner.keywords().len()
        );

        let scores = score_source(config.scoring.seed);

        Ok(Self::from_parts(
            config,
            Arc::new(media),
            TextDetector::new(Arc::new(classifier), scanner),
            scores,
            metrics_handle,
        ))
    }

    /// Assemble state from prebuilt parts
    pub fn from_parts(
        config: AppConfig,
        media: Arc<dyn MediaDetector>,
        text: TextDetector,
        scores: Arc<dyn ScoreSource>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            media,
            text,
            scores,
            metrics_handle,
        }
    }
}

/// Seeded draws when configured, thread RNG otherwise
pub fn score_source(seed: Option<u64>) -> Arc<dyn ScoreSource> {
    match seed {
        Some(seed) => {
            info!("Auxiliary sub-scores seeded with {}", seed);
            Arc::new(SeededSource::new(seed))
        }
        None => Arc::new(ThreadRngSource),
    }
}
