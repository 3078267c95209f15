#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use image_detect_gateway::config::GatewayConfig;
use image_detect_gateway::services::prediction::{PredictionError, PredictionService};
use image_detect_gateway::{AppState, create_app};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// One part of a hand-built multipart body.
pub struct FormPart<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> FormPart<'a> {
    pub fn file(name: &'a str, filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some("application/octet-stream"),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({}): {:?}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}

pub fn staged_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// What a [`StubPredictor`] answers with.
pub enum StubReply {
    Ok(Value),
    Status(u16, Value),
    InvalidFormat,
}

/// In-process stand-in for the remote prediction service.
pub struct StubPredictor {
    reply: StubReply,
    pub calls: AtomicUsize,
    /// Bytes of the staged file as seen during the call.
    pub seen: Mutex<Option<(String, Vec<u8>)>>,
}

impl StubPredictor {
    pub fn new(reply: StubReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PredictionService for StubPredictor {
    async fn predict(&self, path: &Path, filename: &str) -> Result<Value, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = tokio::fs::read(path).await?;
        *self.seen.lock().unwrap() = Some((filename.to_string(), bytes));

        match &self.reply {
            StubReply::Ok(value) => Ok(value.clone()),
            StubReply::Status(status, body) => Err(PredictionError::UpstreamStatus {
                status: *status,
                body: body.clone(),
            }),
            StubReply::InvalidFormat => Err(PredictionError::InvalidFormat),
        }
    }

    fn endpoint(&self) -> &str {
        "stub://predict"
    }
}

/// Gateway backed by a fresh temporary staging directory.
pub struct TestGateway {
    pub app: Router,
    pub dir: TempDir,
}

impl TestGateway {
    pub async fn new(predictor: Arc<dyn PredictionService>) -> Self {
        Self::with_config(predictor, |_| {}).await
    }

    pub async fn with_config(
        predictor: Arc<dyn PredictionService>,
        adjust: impl FnOnce(&mut GatewayConfig),
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GatewayConfig::development(dir.path().join("uploads"));
        adjust(&mut config);

        let state = AppState::new(config, predictor);
        state.staging.ensure_dir().await.unwrap();

        Self {
            app: create_app(state),
            dir,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }
}
