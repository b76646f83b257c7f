//! Admin API: case management and file inspection. Every handler requires
//! [`AdminGuard`].

use crate::{
    errors::AppError,
    handlers::auth::AdminGuard,
    models::case::Case,
    services::files::FileEntry,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Request body for `POST /admin/cases`.
#[derive(Debug, Deserialize)]
pub struct CreateCaseReq {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: Case,
    pub files: Vec<FileEntry>,
}

/// GET `/admin/cases`
pub async fn list_cases(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<Case>>, AppError> {
    Ok(Json(state.cases.list_cases().await?))
}

/// POST `/admin/cases`
pub async fn create_case(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<CreateCaseReq>,
) -> Result<impl IntoResponse, AppError> {
    let case = state.cases.create_case(&req.name).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

/// GET `/admin/cases/{container}`: case row plus its files.
pub async fn get_case(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<CaseDetail>, AppError> {
    let case = state.cases.get_case(&container).await?;
    let files = state.files.list_files(&case.container_name).await?;
    Ok(Json(CaseDetail { case, files }))
}

/// DELETE `/admin/cases/{container}`
pub async fn delete_case(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<StatusCode, AppError> {
    state.cases.delete_case(&container).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/admin/cases/{container}/files`
pub async fn list_files(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(container): Path<String>,
) -> Result<Json<Vec<FileEntry>>, AppError> {
    let case = state.cases.get_case(&container).await?;
    Ok(Json(state.files.list_files(&case.container_name).await?))
}

/// GET `/admin/cases/{container}/files/{*key}`: download as attachment.
pub async fn download_file(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path((container, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let case = state.cases.get_case(&container).await?;
    let data = state.files.download_file(&case.container_name, &key).await?;

    let content_type = if key.ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    };
    let length = data.len();

    let mut response = Response::new(Body::from(data));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&key)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// DELETE `/admin/cases/{container}/files/{*key}`
pub async fn delete_file(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path((container, key)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let case = state.cases.get_case(&container).await?;
    state.files.delete_file(&case.container_name, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `attachment` disposition with an ASCII-only filename.
fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let name = if safe.is_empty() { "download" } else { &safe };
    format!("attachment; filename=\"{name}\"")
}
