//! Detector traits and common result types

use async_trait::async_trait;
use std::path::Path;
use truthlens_core::{MediaKind, Result, TextLabel};

/// Trait for text authenticity classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Trait for media authenticity detectors
///
/// Implementations read the payload at `path` and return the model's
/// score in `[0, 1]`.
#[async_trait]
pub trait MediaDetector: Send + Sync {
    async fn detect(&self, kind: MediaKind, path: &Path) -> Result<f32>;

    fn name(&self) -> &str;
}

/// Result of text classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Predicted label (argmax of the distribution)
    pub label: TextLabel,

    /// Probability mass on the FAKE class (0.0-1.0)
    pub score: f32,

    /// Additional metadata
    pub metadata: ClassificationMetadata,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Build a result from a (REAL, FAKE) probability distribution
    pub fn from_probabilities(probs: &[f32]) -> Self {
        // First maximum wins on ties
        let max_idx = probs
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (idx, &p)| {
                if p > best.1 {
                    (idx, p)
                } else {
                    best
                }
            })
            .0;

        let score = probs.get(TextLabel::Fake.index()).copied().unwrap_or(0.0);

        Self {
            label: TextLabel::from_index(max_idx),
            score,
            metadata: ClassificationMetadata::default(),
            latency_us: 0,
        }
    }

    /// FAKE probability as a percentage
    pub fn confidence_percent(&self) -> f64 {
        f64::from(self.score) * 100.0
    }
}

/// Metadata about classification
#[derive(Debug, Clone, Default)]
pub struct ClassificationMetadata {
    /// Model name or version
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_probabilities_fake() {
        let result = ClassificationResult::from_probabilities(&[0.2, 0.8]);
        assert_eq!(result.label, TextLabel::Fake);
        assert!((result.score - 0.8).abs() < 1e-6);
        assert!((result.confidence_percent() - 80.0).abs() < 1e-4);
        assert!(result.metadata.model.is_none());
    }

    #[test]
    fn test_from_probabilities_real() {
        let result = ClassificationResult::from_probabilities(&[0.9, 0.1]);
        assert_eq!(result.label, TextLabel::Real);
        assert!((result.score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_tie_resolves_to_real() {
        let result = ClassificationResult::from_probabilities(&[0.5, 0.5]);
        assert_eq!(result.label, TextLabel::Real);
    }
}
