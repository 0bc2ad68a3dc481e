//! Text authenticity detection
//!
//! A [`TextDetector`] pairs a sequence classifier with a keyword scan and
//! shapes both into the [`TextReport`] returned by the fake-news endpoint.

pub mod bert;
pub mod keywords;

pub use bert::BertTextClassifier;
pub use keywords::KeywordScanner;

use crate::classifier::Classifier;
use std::sync::Arc;
use truthlens_core::{round1, Result, TextReport};

/// Classifier plus keyword scan
#[derive(Clone)]
pub struct TextDetector {
    classifier: Arc<dyn Classifier>,
    scanner: KeywordScanner,
}

impl TextDetector {
    pub fn new(classifier: Arc<dyn Classifier>, scanner: KeywordScanner) -> Self {
        Self {
            classifier,
            scanner,
        }
    }

    /// Classify `text` and compose the display report
    pub async fn detect(&self, text: &str) -> Result<TextReport> {
        let result = self.classifier.classify(text).await?;
        let suspicious_phrases = self.scanner.scan(text);

        tracing::debug!(
            classifier = self.classifier.name(),
            model = result.metadata.model.as_deref().unwrap_or("unknown"),
            label = %result.label,
            score = result.score,
            latency_us = result.latency_us,
            phrases = suspicious_phrases.len(),
            "Text classified"
        );

        Ok(TextReport {
            result: result.label.message().to_string(),
            confidence: round1(result.confidence_percent()),
            suspicious_phrases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationResult;
    use crate::config::default_keywords;
    use async_trait::async_trait;
    use truthlens_core::{Error, TextLabel};

    struct StaticClassifier(Vec<f32>);

    #[async_trait]
    impl Classifier for StaticClassifier {
        async fn classify(&self, _text: &str) -> Result<ClassificationResult> {
            Ok(ClassificationResult::from_probabilities(&self.0))
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl Classifier for BrokenClassifier {
        async fn classify(&self, _text: &str) -> Result<ClassificationResult> {
            Err(Error::inference("Tokenization failed: boom"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn detector(classifier: Arc<dyn Classifier>) -> TextDetector {
        TextDetector::new(classifier, KeywordScanner::new(&default_keywords()).unwrap())
    }

    #[tokio::test]
    async fn test_fake_report() {
        let detector = detector(Arc::new(StaticClassifier(vec![0.2766, 0.7234])));
        let report = detector.detect("This is a FAKE conspiracy").await.unwrap();

        assert_eq!(report.result, TextLabel::Fake.message());
        assert_eq!(report.confidence, 72.3);
        assert_eq!(report.suspicious_phrases, vec!["fake", "conspiracy"]);
    }

    #[tokio::test]
    async fn test_real_report() {
        let detector = detector(Arc::new(StaticClassifier(vec![0.9, 0.1])));
        let report = detector.detect("Council approves budget").await.unwrap();

        assert_eq!(report.result, "This content appears to be legitimate news");
        assert_eq!(report.confidence, 10.0);
        assert!(report.suspicious_phrases.is_empty());
    }

    #[tokio::test]
    async fn test_classifier_error_propagates() {
        let detector = detector(Arc::new(BrokenClassifier));
        let err = detector.detect("anything").await.unwrap_err();
        assert_eq!(err.kind(), "inference");
    }
}
