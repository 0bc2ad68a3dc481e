//! TruthLens Server
//!
//! HTTP front end for the TruthLens detectors:
//! - `POST /deepfake`: multipart upload scored by the media models
//! - `POST /fakenews`: JSON text scored by the text classifier
//! - `GET /health` and `GET /metrics` for operations

pub mod cli;
pub mod config;
pub mod routes;
pub mod state;
pub mod upload;

pub use config::AppConfig;
pub use routes::{create_router, AppError};
pub use state::AppState;
