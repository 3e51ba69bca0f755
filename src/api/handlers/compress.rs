use crate::AppState;
use crate::api::error::AppError;
use crate::models::{StagedUpload, StoredObject, UploadOptions};
use crate::services::temp_files::{TempArtifacts, TempFileManager};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

pub const NO_FILE_MESSAGE: &str = "No file uploaded";
pub const SUCCESS_MESSAGE: &str = "Compression complete and uploaded to storage";

/// Multipart form accepted by `/compress-upload` (documentation only)
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct CompressUploadForm {
    /// The PDF to compress
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// Exact destination path in the bucket
    storage_path: Option<String>,
    /// Owner segment for derived paths (default: "anonymous")
    user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressUploadResponse {
    pub message: String,
    pub path: String,
    pub url: String,
    pub original_size_mb: f64,
    pub compressed_size_mb: f64,
}

impl From<StoredObject> for CompressUploadResponse {
    fn from(object: StoredObject) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            path: object.path,
            url: object.url,
            original_size_mb: object.original_size_mb,
            compressed_size_mb: object.compressed_size_mb,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    /// Present only when the compressed output is over the limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size_mb: Option<f64>,
}

#[utoipa::path(
    post,
    path = "/compress-upload",
    request_body(content = CompressUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "PDF compressed and stored", body = CompressUploadResponse),
        (status = 400, description = "No file in the request", body = ErrorResponse),
        (status = 413, description = "Upload or compressed output too large", body = ErrorResponse),
        (status = 500, description = "Compression or storage failure", body = ErrorResponse)
    ),
    tag = "compression"
)]
pub async fn compress_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CompressUploadResponse>, AppError> {
    let mut artifacts = TempArtifacts::new();
    let result = run(&state, multipart, &mut artifacts).await;
    artifacts.cleanup();
    result.map(|object| Json(object.into()))
}

async fn run(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
    artifacts: &mut TempArtifacts,
) -> Result<StoredObject, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Rejected non-multipart upload: {}", rejection.body_text());
        AppError::BadRequest(NO_FILE_MESSAGE.to_string())
    })?;

    let temp_files = state.compress_upload.temp_files();
    let mut staged: Option<StagedUpload> = None;
    let mut options = UploadOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" if field.file_name().is_some() => {
                if staged.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one file may be uploaded per request".to_string(),
                    ));
                }
                staged = Some(
                    stage_file(field, temp_files, artifacts, state.config.max_input_mb).await?,
                );
            }
            "storagePath" => {
                options.storage_path = Some(field.text().await.map_err(multipart_error)?);
            }
            "userId" => {
                options.user_id = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let staged = staged.ok_or_else(|| AppError::BadRequest(NO_FILE_MESSAGE.to_string()))?;
    tracing::info!(
        "📥 Received '{}' ({} bytes)",
        staged.original_name,
        staged.size
    );

    state
        .compress_upload
        .process(&staged, &options, artifacts)
        .await
}

/// Streams the file field to its temp path, enforcing the input ceiling.
async fn stage_file(
    mut field: Field<'_>,
    temp_files: &TempFileManager,
    artifacts: &mut TempArtifacts,
    max_input_mb: u64,
) -> Result<StagedUpload, AppError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let path = artifacts.track(temp_files.upload_path(&original_name))?;
    let max_bytes = max_input_mb.saturating_mul(1024 * 1024);

    let mut file = tokio::fs::File::create(&path).await?;
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        if size > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {} MB upload limit",
                max_input_mb
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(StagedUpload {
        path,
        original_name,
        size,
    })
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}
