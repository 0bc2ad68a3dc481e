//! TruthLens Core
//!
//! Core types and error handling shared across TruthLens components.
//!
//! This crate provides:
//! - The error type and result alias used by detectors and the server
//! - The media kind tag accepted by the deepfake endpoint
//! - Report shapes returned by both detection endpoints

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    round1, round2, Artifact, DetectionMethods, MediaKind, MediaReport, Severity, Technique,
    TextLabel, TextReport,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{MediaKind, MediaReport, Severity, TextLabel, TextReport};
}
