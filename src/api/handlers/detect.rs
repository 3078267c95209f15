use super::upload::stage_image;
use crate::AppState;
use crate::api::error::AppError;
use crate::models::DetectResponse;
use crate::services::prediction::map_predictions;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::info;

/// Relay an uploaded image to the prediction service and reshape its answer.
///
/// The staged copy only lives for the duration of the call: it is removed
/// once the upstream outcome is known, whatever that outcome is.
#[utoipa::path(
    post,
    path = "/detect",
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Detection result", body = DetectResponse),
        (status = 400, description = "No file uploaded for detection", body = ErrorResponse),
        (status = 500, description = "Prediction service failure", body = DetectFailure)
    ),
    tag = "detection"
)]
pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, AppError> {
    let staged = stage_image(&state.staging, multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded for detection".to_string()))?;

    info!("Image path: {}", staged.path().display());

    let outcome = state
        .predictor
        .predict(staged.path(), staged.name())
        .await
        .and_then(map_predictions);

    drop(staged);

    let detection_result = outcome?;
    info!(
        "Detection returned {} predictions",
        detection_result.predictions.len()
    );

    Ok(Json(DetectResponse {
        success: true,
        detection_result,
    }))
}
