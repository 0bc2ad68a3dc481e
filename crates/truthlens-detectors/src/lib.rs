//! TruthLens Detectors
//!
//! Candle-based detectors behind the TruthLens service:
//! - Media: a convolutional network for images, the same network plus an
//!   LSTM for video frames, and a convolutional network over MFCC
//!   features for audio
//! - Text: a BERT sequence classifier paired with a suspicious keyword scan
//!
//! Detectors produce raw model scores. [`scoring`] turns a media score
//! into the full display report.

pub mod classifier;
pub mod config;
pub mod loader;
pub mod media;
pub mod scoring;
pub mod text;

pub use classifier::{ClassificationMetadata, ClassificationResult, Classifier, MediaDetector};
pub use config::{MediaConfig, ModelSource, TextConfig};
pub use media::{CandleMediaDetector, MediaModels};
pub use scoring::{
    build_media_report, compose_media_report, local_timestamp, FixedSource, ScoreSource,
    SeededSource, SubScores, ThreadRngSource,
};
pub use text::{BertTextClassifier, KeywordScanner, TextDetector};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier, MediaDetector};
    pub use crate::config::{MediaConfig, TextConfig};
    pub use crate::media::CandleMediaDetector;
    pub use crate::scoring::{compose_media_report, ScoreSource};
    pub use crate::text::{BertTextClassifier, KeywordScanner, TextDetector};
}
