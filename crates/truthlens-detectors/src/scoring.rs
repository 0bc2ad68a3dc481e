//! Media report composition
//!
//! Only one number in a media report comes from a model: the detector
//! score for the submitted kind. The remaining sub-scores are uniform
//! draws within fixed ranges, taken from a [`ScoreSource`] so callers can
//! replay a known sequence. Draw order is fixed:
//!
//! 1. image/video: facial jitter `U(-5, 5)`, then audio `U(80, 95)`;
//!    audio: facial `U(70, 90)`, then audio jitter `U(-5, 5)`
//! 2. metadata `U(90, 100)`
//! 3. temporal `U(85, 100)`
//!
//! The overall confidence is `0.3*metadata + 0.3*temporal + 0.2*facial +
//! 0.2*audio`, and media is reported authentic when the rounded overall
//! confidence exceeds 85.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use truthlens_core::{
    round1, round2, Artifact, DetectionMethods, MediaKind, MediaReport, Severity, Technique,
};

/// Overall confidence above which media is reported authentic
pub const AUTHENTIC_THRESHOLD: f64 = 85.0;

const JITTER: (f64, f64) = (-5.0, 5.0);
const AUDIO_RANGE: (f64, f64) = (80.0, 95.0);
const FACIAL_RANGE: (f64, f64) = (70.0, 90.0);
const METADATA_RANGE: (f64, f64) = (90.0, 100.0);
const TEMPORAL_RANGE: (f64, f64) = (85.0, 100.0);

const METADATA_WEIGHT: f64 = 0.3;
const TEMPORAL_WEIGHT: f64 = 0.3;
const FACIAL_WEIGHT: f64 = 0.2;
const AUDIO_WEIGHT: f64 = 0.2;

/// Source of uniform random draws for auxiliary sub-scores
pub trait ScoreSource: Send + Sync {
    /// Draw a value from the inclusive range `[low, high]`
    fn uniform(&self, low: f64, high: f64) -> f64;
}

/// Unseeded draws from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl ScoreSource for ThreadRngSource {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Reproducible draws from a seeded RNG shared across requests
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ScoreSource for SeededSource {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        self.rng.lock().gen_range(low..=high)
    }
}

/// Replays a fixed sequence of draws
///
/// Values are returned verbatim regardless of the requested range. Once
/// the sequence is exhausted the midpoint of the range is returned.
pub struct FixedSource {
    values: Mutex<VecDeque<f64>>,
}

impl FixedSource {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }

    /// Number of draws not yet consumed
    pub fn remaining(&self) -> usize {
        self.values.lock().len()
    }
}

impl ScoreSource for FixedSource {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        self.values
            .lock()
            .pop_front()
            .unwrap_or((low + high) / 2.0)
    }
}

/// The four display sub-scores of a media report, as percentages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub facial: f64,
    pub audio: f64,
    pub metadata: f64,
    pub temporal: f64,
}

impl SubScores {
    /// Derive sub-scores from a model percentage and random draws
    pub fn sample(kind: MediaKind, model_conf: f64, source: &dyn ScoreSource) -> Self {
        let (facial, audio) = if kind.is_visual() {
            let facial = model_conf + source.uniform(JITTER.0, JITTER.1);
            let audio = source.uniform(AUDIO_RANGE.0, AUDIO_RANGE.1);
            (facial, audio)
        } else {
            let facial = source.uniform(FACIAL_RANGE.0, FACIAL_RANGE.1);
            let audio = model_conf + source.uniform(JITTER.0, JITTER.1);
            (facial, audio)
        };
        let metadata = source.uniform(METADATA_RANGE.0, METADATA_RANGE.1);
        let temporal = source.uniform(TEMPORAL_RANGE.0, TEMPORAL_RANGE.1);

        Self {
            facial: clamp_percent(facial),
            audio: clamp_percent(audio),
            metadata: clamp_percent(metadata),
            temporal: clamp_percent(temporal),
        }
    }

    /// Weighted overall confidence
    pub fn overall(&self) -> f64 {
        METADATA_WEIGHT * self.metadata
            + TEMPORAL_WEIGHT * self.temporal
            + FACIAL_WEIGHT * self.facial
            + AUDIO_WEIGHT * self.audio
    }
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Assemble the wire report from sub-scores
pub fn build_media_report(
    scores: &SubScores,
    processing_time: Duration,
    timestamp: String,
) -> MediaReport {
    let overall_confidence = round1(scores.overall());

    let artifacts = vec![
        artifact(
            "Facial Analysis",
            "Inconsistencies in facial features detected.",
            scores.facial,
        ),
        artifact(
            "Audio Sync",
            "Issues in audio-visual synchronization.",
            scores.audio,
        ),
        artifact(
            "Temporal Coherence",
            "Irregularities in frame transitions.",
            scores.temporal,
        ),
    ];

    let techniques = vec![
        technique(
            "Deep Neural Network",
            "AI-based feature extraction and analysis.",
            scores.facial,
            "Zap",
        ),
        technique(
            "Metadata Verification",
            "Integrity check of file metadata.",
            scores.metadata,
            "Shield",
        ),
        technique(
            "Temporal Analysis",
            "Frame consistency and motion analysis.",
            scores.temporal,
            "Clock",
        ),
    ];

    MediaReport {
        is_authentic: overall_confidence > AUTHENTIC_THRESHOLD,
        overall_confidence,
        artifacts,
        techniques,
        detection_methods: DetectionMethods {
            facial: round1(scores.facial),
            audio: round1(scores.audio),
            metadata: round1(scores.metadata),
            temporal: round1(scores.temporal),
        },
        processing_time: round2(processing_time.as_secs_f64()),
        timestamp,
    }
}

/// Sample sub-scores and assemble a report in one step
pub fn compose_media_report(
    kind: MediaKind,
    model_score: f32,
    source: &dyn ScoreSource,
    processing_time: Duration,
    timestamp: String,
) -> MediaReport {
    let model_conf = f64::from(model_score) * 100.0;
    let scores = SubScores::sample(kind, model_conf, source);
    build_media_report(&scores, processing_time, timestamp)
}

/// Local wall-clock time in ISO-8601 without offset
pub fn local_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

fn artifact(kind: &str, description: &str, confidence: f64) -> Artifact {
    Artifact {
        kind: kind.to_string(),
        description: description.to_string(),
        severity: Severity::from_confidence(confidence),
        confidence: round1(confidence),
    }
}

fn technique(name: &str, description: &str, confidence: f64, icon: &str) -> Technique {
    Technique {
        name: name.to_string(),
        description: description.to_string(),
        confidence: round1(confidence),
        icon: icon.to_string(),
    }
}
