//! Admin capability check for the `/admin` routes.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
};

/// Proof that the request carried the configured admin bearer token.
///
/// Add this as a handler parameter to require admin access.
pub struct AdminGuard;

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.admin_token.as_deref().ok_or_else(|| {
            AppError::new(StatusCode::FORBIDDEN, "Admin access is not configured.")
        })?;

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "Missing admin token."))?;

        if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            return Err(AppError::new(StatusCode::FORBIDDEN, "Invalid admin token."));
        }
        Ok(AdminGuard)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
