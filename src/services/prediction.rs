use crate::models::{DetectionResult, Prediction, UpstreamPrediction};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Multipart field the prediction service reads the image from.
pub const UPSTREAM_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status code {status}")]
    UpstreamStatus { status: u16, body: Value },

    #[error("Invalid response format from ML service")]
    InvalidFormat,

    #[error("Failed to read staged file: {0}")]
    Io(#[from] std::io::Error),
}

impl PredictionError {
    /// Body received from the prediction service, when there was one worth
    /// reporting back to the caller.
    pub fn upstream_body(&self) -> Option<Value> {
        match self {
            PredictionError::UpstreamStatus { body, .. } => Some(body.clone()),
            _ => None,
        }
    }
}

/// Trait for the remote image classifier
#[async_trait::async_trait]
pub trait PredictionService: Send + Sync {
    /// Send the file at `path` (reported upstream as `filename`) and return
    /// the raw JSON answer of a successful call.
    async fn predict(&self, path: &Path, filename: &str) -> Result<Value, PredictionError>;

    /// Where requests are sent, for logging and health output.
    fn endpoint(&self) -> &str;
}

/// Prediction service reached over HTTP with a multipart POST
pub struct HttpPredictionService {
    client: reqwest::Client,
    url: String,
}

impl HttpPredictionService {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(&self, path: &Path, filename: &str) -> Result<Value, PredictionError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        let mime = mime_guess::from_path(filename).first_or_octet_stream();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new().part(UPSTREAM_FIELD, part);

        info!("Sending request to ML service: {}", self.url);
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = parse_body(&bytes);
        info!("ML Service Response Status: {}", status);
        debug!("ML Service Response Data: {}", body);

        if !status.is_success() {
            return Err(PredictionError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// JSON when the body parses as JSON, otherwise the body as text.
fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Reshape `{predictions: [{movie, confidence}]}` into
/// `{predictions: [{title, accuracy}], raw}`.
pub fn map_predictions(raw: Value) -> Result<DetectionResult, PredictionError> {
    let entries = raw
        .get("predictions")
        .filter(|p| p.is_array())
        .cloned()
        .ok_or(PredictionError::InvalidFormat)?;

    let entries: Vec<UpstreamPrediction> =
        serde_json::from_value(entries).map_err(|_| PredictionError::InvalidFormat)?;

    Ok(DetectionResult {
        predictions: entries.into_iter().map(Prediction::from).collect(),
        raw,
    })
}
