//! Router tests
//!
//! Drive the full router with stub detectors, checking request validation,
//! report shapes, and that staged uploads never outlive a request.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use truthlens_core::{Error, MediaKind, Result};
use truthlens_detectors::config::default_keywords;
use truthlens_detectors::{
    ClassificationResult, Classifier, FixedSource, KeywordScanner, MediaDetector, TextDetector,
};
use truthlens_server::{create_router, AppConfig, AppState};

const BOUNDARY: &str = "truthlens-test-boundary";

/// Calls seen by the stub media detector: kind, path, and whether the
/// staged file existed at detection time
#[derive(Default)]
struct Recorded {
    calls: Mutex<Vec<(MediaKind, String, bool)>>,
}

impl Recorded {
    fn push(&self, kind: MediaKind, path: String, existed: bool) {
        self.calls.lock().unwrap().push((kind, path, existed));
    }

    fn calls(&self) -> Vec<(MediaKind, String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

/// Media detector returning a fixed score and recording what it was given
struct StubMedia {
    score: f32,
    fail: bool,
    seen: Arc<Recorded>,
}

#[async_trait]
impl MediaDetector for StubMedia {
    async fn detect(&self, kind: MediaKind, path: &Path) -> Result<f32> {
        self.seen
            .push(kind, path.display().to_string(), path.exists());
        if self.fail {
            return Err(Error::preprocess("No frames extracted from video"));
        }
        Ok(self.score)
    }

    fn name(&self) -> &str {
        "stub-media"
    }
}

/// Text classifier returning a fixed distribution
struct StubClassifier {
    probs: Vec<f32>,
    fail: bool,
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(&self, _text: &str) -> Result<ClassificationResult> {
        if self.fail {
            return Err(Error::inference("model unavailable"));
        }
        Ok(ClassificationResult::from_probabilities(&self.probs))
    }

    fn name(&self) -> &str {
        "stub-text"
    }
}

struct Harness {
    router: Router,
    upload_dir: PathBuf,
    seen: Arc<Recorded>,
    _tmp: TempDir,
}

struct HarnessBuilder {
    media_score: f32,
    media_fail: bool,
    probs: Vec<f32>,
    text_fail: bool,
    max_upload_bytes: Option<usize>,
}

impl HarnessBuilder {
    fn new() -> Self {
        Self {
            media_score: 0.9,
            media_fail: false,
            probs: vec![0.9, 0.1],
            text_fail: false,
            max_upload_bytes: None,
        }
    }

    fn media_failing(mut self) -> Self {
        self.media_fail = true;
        self
    }

    fn text(mut self, real: f32, fake: f32) -> Self {
        self.probs = vec![real, fake];
        self
    }

    fn text_failing(mut self) -> Self {
        self.text_fail = true;
        self
    }

    fn max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    fn build(self) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let upload_dir = tmp.path().join("uploads");

        let mut config = AppConfig::default();
        config.server.upload_dir = upload_dir.clone();
        if let Some(limit) = self.max_upload_bytes {
            config.server.max_upload_bytes = limit;
        }

        let seen = Arc::new(Recorded::default());
        let media = StubMedia {
            score: self.media_score,
            fail: self.media_fail,
            seen: seen.clone(),
        };
        let classifier = StubClassifier {
            probs: self.probs,
            fail: self.text_fail,
        };
        let text = TextDetector::new(
            Arc::new(classifier),
            KeywordScanner::new(&default_keywords()).unwrap(),
        );

        // Jitter 0, then the remaining sub-scores at 90/95/95
        let scores = Arc::new(FixedSource::new([0.0, 90.0, 95.0, 95.0]));
        let handle = PrometheusBuilder::new().build_recorder().handle();

        let state = AppState::from_parts(config, Arc::new(media), text, scores, handle);

        Harness {
            router: create_router(state),
            upload_dir,
            seen,
            _tmp: tmp,
        }
    }
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, body)
    }

    /// Files left behind in the upload directory
    fn staged_files(&self) -> usize {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn deepfake_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/deepfake")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn fakenews_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/fakenews")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn file_part<'a>(filename: &'a str, bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        name: "file",
        filename,
        bytes,
    }
}

fn media_type(value: &str) -> Part<'_> {
    Part::Text {
        name: "mediaType",
        value,
    }
}

#[tokio::test]
async fn test_health() {
    let harness = HarnessBuilder::new().build();
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = harness.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let harness = HarnessBuilder::new().build();
    let request = Request::get("/nope").body(Body::empty()).unwrap();

    let (status, body) = harness.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_metrics_renders() {
    let harness = HarnessBuilder::new().build();
    let request = Request::get("/metrics").body(Body::empty()).unwrap();

    let response = harness.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_file_part() {
    let harness = HarnessBuilder::new().build();

    let (status, body) = harness.send(deepfake_request(&[media_type("image")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
    assert!(harness.seen.calls().is_empty());
}

#[tokio::test]
async fn test_non_multipart_body() {
    let harness = HarnessBuilder::new().build();
    let request = Request::post("/deepfake")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = harness.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_empty_filename() {
    let harness = HarnessBuilder::new().build();

    let (status, body) = harness
        .send(deepfake_request(&[file_part("", b"data"), media_type("image")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file selected");
    assert_eq!(harness.staged_files(), 0);
}

#[tokio::test]
async fn test_unsupported_media_type_writes_nothing() {
    let harness = HarnessBuilder::new().build();

    let (status, body) = harness
        .send(deepfake_request(&[
            file_part("doc.pdf", b"%PDF-1.4"),
            media_type("document"),
        ]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported media type");
    assert_eq!(harness.staged_files(), 0);
    assert!(harness.seen.calls().is_empty());
}

#[tokio::test]
async fn test_media_type_defaults_to_image() {
    let harness = HarnessBuilder::new().build();

    let (status, _) = harness
        .send(deepfake_request(&[file_part("face.png", b"png bytes")]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let calls = harness.seen.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, MediaKind::Image);
}

#[tokio::test]
async fn test_media_report_shape_and_cleanup() {
    let harness = HarnessBuilder::new().build();

    let (status, body) = harness
        .send(deepfake_request(&[
            media_type("video"),
            file_part("clip.mp4", b"not really a video"),
        ]))
        .await;
    assert_eq!(status, StatusCode::OK);

    // facial 90 + 0, audio 90, metadata 95, temporal 95
    assert_eq!(body["isAuthentic"], true);
    assert_eq!(body["overallConfidence"], 93.0);
    assert_eq!(body["detectionMethods"]["facial"], 90.0);
    assert_eq!(body["detectionMethods"]["temporal"], 95.0);
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 3);
    assert_eq!(body["techniques"].as_array().unwrap().len(), 3);
    assert!(body["processingTime"].as_f64().unwrap() >= 0.0);
    assert!(body["timestamp"].as_str().unwrap().contains('T'));

    // The detector saw the staged file, which is gone afterwards
    let calls = harness.seen.calls();
    assert_eq!(calls[0].0, MediaKind::Video);
    assert!(calls[0].1.ends_with("_clip.mp4"));
    assert!(calls[0].2);
    assert_eq!(harness.staged_files(), 0);
}

#[tokio::test]
async fn test_detector_failure_is_500_and_cleans_up() {
    let harness = HarnessBuilder::new().media_failing().build();

    let (status, body) = harness
        .send(deepfake_request(&[
            file_part("clip.mp4", b"junk"),
            media_type("video"),
        ]))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        "preprocessing failed: No frames extracted from video"
    );
    assert_eq!(harness.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let harness = HarnessBuilder::new().max_upload_bytes(1024).build();
    let big = vec![0u8; 8 * 1024];

    let (status, _) = harness
        .send(deepfake_request(&[file_part("big.png", &big)]))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(harness.staged_files(), 0);
}

#[tokio::test]
async fn test_fakenews_requires_text() {
    let harness = HarnessBuilder::new().build();

    for body in ["{}", r#"{"text": 7}"#, r#"{"text": null}"#, "not json"] {
        let (status, response) = harness.send(fakenews_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(response["error"], "No text provided");
    }
}

#[tokio::test]
async fn test_fakenews_real_report() {
    let harness = HarnessBuilder::new().text(0.9, 0.1).build();

    let (status, body) = harness
        .send(fakenews_request(r#"{"text": "Council approves new budget"}"#))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "This content appears to be legitimate news");
    // Confidence is the FAKE probability regardless of label
    assert_eq!(body["confidence"], 10.0);
    assert_eq!(body["suspiciousPhrases"], serde_json::json!([]));
}

#[tokio::test]
async fn test_fakenews_fake_report_with_phrases() {
    let harness = HarnessBuilder::new().text(0.2, 0.8).build();

    let (status, body) = harness
        .send(fakenews_request(r#"{"text": "This is a FAKE conspiracy"}"#))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"],
        "This content shows characteristics of potential misinformation"
    );
    assert_eq!(body["confidence"], 80.0);

    assert_eq!(
        body["suspiciousPhrases"],
        serde_json::json!(["fake", "conspiracy"])
    );
}

#[tokio::test]
async fn test_fakenews_accepts_empty_text() {
    let harness = HarnessBuilder::new().build();

    let (status, _) = harness.send(fakenews_request(r#"{"text": ""}"#)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_classifier_failure_is_500() {
    let harness = HarnessBuilder::new().text_failing().build();

    let (status, body) = harness
        .send(fakenews_request(r#"{"text": "anything"}"#))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("model unavailable"));
}
