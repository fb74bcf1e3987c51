//! Receipt upload endpoint.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use pantry_core::PipelineResult;

use crate::error::ApiError;
use crate::server::GatewayState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub processing_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub result: PipelineResult,
}

struct UploadedFile {
    filename: Option<String>,
    bytes: axum::body::Bytes,
}

fn processing_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("upload_{}_{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..8])
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

async fn read_file_field(multipart: &mut Multipart, limit: usize) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > limit {
            return Err(ApiError::too_large(limit));
        }
        if bytes.is_empty() {
            return Err(ApiError::bad_request("uploaded file is empty"));
        }
        return Ok(UploadedFile { filename, bytes });
    }
    Err(ApiError::bad_request(format!("multipart field `{FILE_FIELD}` is required")))
}

/// Handler for `POST /api/v1/receipts/upload`.
///
/// 200 when both stages succeed, 502 when either reports a failure.
pub async fn upload_receipt(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let file = read_file_field(&mut multipart, state.max_upload_bytes).await?;
    let processing_id = processing_id();
    info!(
        processing_id = %processing_id,
        size_bytes = file.bytes.len(),
        filename = file.filename.as_deref().unwrap_or("-"),
        "Receipt uploaded"
    );

    let result = state.pipeline.process(&file.bytes).await;

    let (status, message) = match result.outcome.message() {
        None => (StatusCode::OK, "Receipt processed".to_string()),
        Some(reason) => (
            StatusCode::BAD_GATEWAY,
            format!("Receipt processing failed: {reason}"),
        ),
    };
    info!(processing_id = %processing_id, status = status.as_u16(), "Receipt handled");

    Ok((
        status,
        Json(UploadResponse {
            processing_id,
            message,
            filename: file.filename,
            result,
        }),
    ))
}
