use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One entry as returned by the prediction service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamPrediction {
    #[serde(default)]
    pub movie: Value,
    #[serde(default)]
    pub confidence: Value,
}

/// Reshaped prediction handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Prediction {
    #[schema(value_type = Option<String>)]
    pub title: Value,
    #[schema(value_type = Option<f64>)]
    pub accuracy: Value,
}

impl From<UpstreamPrediction> for Prediction {
    fn from(p: UpstreamPrediction) -> Self {
        Self {
            title: p.movie,
            accuracy: p.confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DetectionResult {
    pub predictions: Vec<Prediction>,
    #[schema(value_type = Object)]
    pub raw: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub success: bool,
    pub detection_result: DetectionResult,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetectFailure {
    pub success: bool,
    pub error: String,
    pub details: String,
    #[schema(value_type = Option<Object>)]
    pub response: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
