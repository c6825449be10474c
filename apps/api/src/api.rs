//! Shared request/response plumbing for every JSON endpoint.

use axum::{extract::FromRequest, Json};
use serde::Serialize;

use crate::errors::AppError;

/// JSON body extractor whose rejections render through `AppError`,
/// so a malformed body gets the same envelope as any other 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Success envelope: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Returns the trimmed value when it is present and not blank.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
