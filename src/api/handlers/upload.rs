use crate::AppState;
use crate::api::error::AppError;
use crate::models::{MessageResponse, UploadResponse};
use crate::services::staging::{StagedFile, StagingArea};
use crate::utils::validation::FALLBACK_FILENAME;
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
    http::StatusCode,
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

/// Multipart field carrying the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Multipart form accepted by `/upload` and `/detect`.
#[derive(ToSchema)]
pub struct ImageUpload {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Stage the first file part named `image`, skipping every other part.
///
/// Returns `Ok(None)` when the request carries no such file, including
/// requests that are not multipart at all.
pub(crate) async fn stage_image(
    staging: &StagingArea,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<StagedFile>, AppError> {
    let Ok(mut multipart) = multipart else {
        return Ok(None);
    };

    let mut staged = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if staged.is_some() || field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // Plain form values named `image` are not files
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let original_name = if original_name.is_empty() {
            FALLBACK_FILENAME.to_string()
        } else {
            original_name
        };

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let file = staging
            .stage(&original_name, reader)
            .await
            .map_err(staging_error)?;
        staged = Some(file);
    }

    Ok(staged)
}

/// Body errors surface from the reader wrapped in `io::Error`.
fn staging_error(e: std::io::Error) -> AppError {
    if e.get_ref().is_some_and(|inner| inner.is::<MultipartError>()) {
        return match e.into_inner().map(|inner| inner.downcast::<MultipartError>()) {
            Some(Ok(multipart_err)) => multipart_error(*multipart_err),
            _ => AppError::BadRequest("Malformed multipart body".to_string()),
        };
    }
    AppError::Internal(format!("Failed to stage upload: {}", e))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = ImageUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadResponse),
        (status = 400, description = "No file uploaded", body = ErrorResponse)
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let staged = stage_image(&state.staging, multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let size = staged.size();
    let filename = staged.persist();
    tracing::info!("Stored upload {} ({} bytes)", filename, size);

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename,
    }))
}

#[utoipa::path(
    delete,
    path = "/upload/{filename}",
    params(
        ("filename" = String, Path, description = "Generated name returned by /upload")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    tag = "files"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(filename) = filename.map_err(|e| {
        tracing::debug!("Rejected delete path: {}", e);
        AppError::NotFound("File not found".to_string())
    })?;

    state.staging.remove(&filename).await.map_err(|e| {
        tracing::debug!("Delete of {:?} failed: {}", filename, e);
        AppError::NotFound("File not found".to_string())
    })?;

    tracing::info!("Deleted upload {}", filename);
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
