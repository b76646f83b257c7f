//! Defines routes for the public upload endpoint and the admin API.
//!
//! ## Structure
//! - **Health**
//!   - `GET    /healthz`: liveness
//!   - `GET    /readyz`: SQLite and disk readiness
//!
//! - **Intake**
//!   - `POST   /upload`: multipart batch (`secret` + repeated `file`)
//!
//! - **Admin** (bearer token)
//!   - `GET    /admin/cases`: list cases
//!   - `POST   /admin/cases`: create case
//!   - `GET    /admin/cases/{container}`: case detail with files
//!   - `DELETE /admin/cases/{container}`: delete case and its container
//!   - `GET    /admin/cases/{container}/files`: list files
//!   - `GET    /admin/cases/{container}/files/{*key}`: download file
//!   - `DELETE /admin/cases/{container}/files/{*key}`: delete file
//!
//! The wildcard `*key` keeps keys with dots and slashes intact.

use crate::{
    handlers::{
        admin_handlers::{
            create_case, delete_case, delete_file, download_file, get_case, list_cases, list_files,
        },
        health_handlers::{healthz, readyz},
        upload_handlers::upload_files,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build the application router.
///
/// `max_upload_bytes` caps the request body of `POST /upload` only.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .nest("/admin", admin_routes())
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/cases", get(list_cases).post(create_case))
        .route("/cases/{container}", get(get_case).delete(delete_case))
        .route("/cases/{container}/files", get(list_files))
        .route(
            "/cases/{container}/files/{*key}",
            get(download_file).delete(delete_file),
        )
}
