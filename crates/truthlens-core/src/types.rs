//! Core types for TruthLens
//!
//! Everything here is request-scoped: a report is built by a handler,
//! serialized, and dropped. Field names follow the camelCase JSON shape
//! the web frontend consumes.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media submitted to the deepfake endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Wire name of the media kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    /// Whether the real model score feeds the facial sub-score
    pub fn is_visual(&self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(Error::invalid_input("Unsupported media type")),
        }
    }
}

/// Display severity derived from a sub-score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Lower bound (inclusive) of the medium tier
    pub const MEDIUM_FLOOR: f64 = 70.0;
    /// Lower bound (inclusive) of the low tier
    pub const LOW_FLOOR: f64 = 85.0;

    /// Tier a confidence percentage: `< 70` high, `< 85` medium, else low
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < Self::MEDIUM_FLOOR {
            Self::High
        } else if confidence < Self::LOW_FLOOR {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A suspected manipulation artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
}

/// A detection technique and how confident it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub name: String,
    pub description: String,
    pub confidence: f64,
    /// Frontend icon identifier
    pub icon: String,
}

/// Per-method confidence breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionMethods {
    pub facial: f64,
    pub audio: f64,
    pub metadata: f64,
    pub temporal: f64,
}

/// Response body of the media detection endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReport {
    pub is_authentic: bool,
    pub overall_confidence: f64,
    pub artifacts: Vec<Artifact>,
    pub techniques: Vec<Technique>,
    pub detection_methods: DetectionMethods,
    /// Seconds spent handling the request
    pub processing_time: f64,
    /// Local ISO-8601 timestamp
    pub timestamp: String,
}

/// Label predicted by the text classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextLabel {
    Real,
    Fake,
}

impl TextLabel {
    /// Class index in the model's output distribution
    pub fn index(&self) -> usize {
        match self {
            Self::Real => 0,
            Self::Fake => 1,
        }
    }

    pub fn from_index(idx: usize) -> Self {
        if idx == 1 {
            Self::Fake
        } else {
            Self::Real
        }
    }

    /// Human-readable verdict shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            Self::Real => "This content appears to be legitimate news",
            Self::Fake => "This content shows characteristics of potential misinformation",
        }
    }
}

impl fmt::Display for TextLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => f.write_str("REAL"),
            Self::Fake => f.write_str("FAKE"),
        }
    }
}

/// Response body of the text detection endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextReport {
    pub result: String,
    pub confidence: f64,
    pub suspicious_phrases: Vec<String>,
}

/// Round to one decimal place for display
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
