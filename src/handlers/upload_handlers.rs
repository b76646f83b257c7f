//! Public upload endpoint: a secret plus one or more file parts.

use crate::{
    errors::AppError,
    models::upload::{BatchReport, DuplicateFile, IncomingFile, UploadStatus, UploadedFile},
    services::intake::IntakeError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, instrument};

/// Body returned for every upload outcome, errors included.
#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub status: UploadStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    pub uploaded_files: Vec<UploadedFile>,
    pub duplicate_files: Vec<DuplicateFile>,
}

impl From<BatchReport> for UploadResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            status: report.status,
            message: report.message,
            container_name: Some(report.container_name),
            uploaded_files: report.uploaded_files,
            duplicate_files: report.duplicate_files,
        }
    }
}

impl UploadResponse {
    fn error(message: String) -> Self {
        Self {
            status: UploadStatus::Error,
            message,
            container_name: None,
            uploaded_files: Vec::new(),
            duplicate_files: Vec::new(),
        }
    }
}

/// `POST /upload`
///
/// Multipart fields: `secret` (or `connectionId`) and repeated `file` parts.
#[instrument(skip(state, multipart))]
pub async fn upload_files(State(state): State<AppState>, multipart: Multipart) -> Response {
    let (secret, files) = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(err) => return error_response(err),
    };
    debug!("received {} file part(s)", files.len());

    match state.intake.handle_upload(&secret, files).await {
        Ok(report) => (StatusCode::OK, Json(UploadResponse::from(report))).into_response(),
        Err(err) => intake_error_response(err),
    }
}

/// An interrupted batch still reports the files it stored before failing.
fn intake_error_response(err: IntakeError) -> Response {
    match err {
        IntakeError::Interrupted { report, cause } => {
            error!("upload batch failed: {}", cause);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadResponse::from(*report)),
            )
                .into_response()
        }
        other => error_response(other.into()),
    }
}

async fn read_upload_form(mut multipart: Multipart) -> Result<(String, Vec<IncomingFile>), AppError> {
    let mut secret = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(e.status(), format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("secret") | Some("connectionId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::new(e.status(), format!("Failed to read secret: {e}")))?;
                secret = Some(value);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::new(e.status(), format!("Failed to read file: {e}")))?;
                files.push(IncomingFile::new(filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let secret = secret
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Secret is required."))?;
    Ok((secret, files))
}

fn error_response(err: AppError) -> Response {
    (err.status, Json(UploadResponse::error(err.message))).into_response()
}
