//! Axum route handlers for the Contracts API.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::api::{ApiJson, ApiResponse};
use crate::contracts::generator::generate_contract;
use crate::contracts::models::{ContractDocument, ContractRequest};
use crate::contracts::render::contract_html;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/contracts/generate
///
/// Validates the five required fields, drafts the contract with one generation
/// call, stores it and returns it.
pub async fn handle_generate_contract(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ContractRequest>,
) -> Result<Json<ApiResponse<ContractDocument>>, AppError> {
    let terms = request.validate()?;
    let drafted = generate_contract(state.llm.as_ref(), &terms).await?;

    // The store may move the id forward if another contract took it first.
    let contract = state.contracts.save(drafted).await?;
    info!("Generated contract {} for {}", contract.id, contract.provider);

    Ok(ApiResponse::ok(contract))
}

/// GET /api/contracts/:id
pub async fn handle_get_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ContractDocument>>, AppError> {
    let contract = find_contract(&state, &id).await?;
    Ok(ApiResponse::ok(contract))
}

/// GET /api/contracts/:id/export
///
/// Renders the stored contract to PDF and returns it as an attachment.
pub async fn handle_export_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let contract = find_contract(&state, &id).await?;
    let html = contract_html(&contract);

    let pdf = state
        .renderer
        .render_pdf(&html)
        .await
        .map_err(|e| AppError::Render(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&contract.id)),
        ],
        pdf,
    )
        .into_response())
}

async fn find_contract(state: &AppState, id: &str) -> Result<ContractDocument, AppError> {
    state
        .contracts
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {id} not found")))
}

/// `attachment; filename="contract-<id>.pdf"`, with anything outside `[A-Za-z0-9_-]` dropped from the id.
fn attachment_disposition(id: &str) -> String {
    let safe: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("attachment; filename=\"contract-{safe}.pdf\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("1713170000000"),
            "attachment; filename=\"contract-1713170000000.pdf\""
        );
    }

    #[test]
    fn test_attachment_disposition_strips_header_breaking_chars() {
        assert_eq!(
            attachment_disposition("a\"b;\r\nc"),
            "attachment; filename=\"contract-abc.pdf\""
        );
    }
}
