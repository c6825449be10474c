//! Axum route handlers for the Offer API.

use axum::{extract::State, Json};
use serde_json::Value;

use crate::api::{ApiJson, ApiResponse};
use crate::errors::AppError;
use crate::offers::generator::{generate_offer, OfferRequest};
use crate::state::AppState;

/// POST /api/offers/generate
///
/// Validates the brief, makes exactly one generation call and returns the parsed copy.
pub async fn handle_generate_offer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OfferRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let brief = request.validate()?;
    let offer = generate_offer(state.llm.as_ref(), &brief).await?;
    Ok(ApiResponse::ok(offer))
}
