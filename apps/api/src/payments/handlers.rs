//! Axum route handlers for the Payments API.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::api::{non_blank, ApiJson, ApiResponse};
use crate::errors::AppError;
use crate::payments::events::{apply_event, WebhookEvent};
use crate::payments::gateway::CheckoutRequest;
use crate::payments::plans::PlanType;
use crate::payments::signature::SIGNATURE_HEADER;
use crate::payments::store::SubscriptionStatus;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_id: Option<String>,
    pub plan_type: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub session_id: String,
    pub url: Option<String>,
}

/// POST /api/payments/create-subscription
///
/// The plan is resolved before any gateway call, so an unknown plan never
/// creates a remote customer.
pub async fn handle_create_subscription(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSubscriptionRequest>,
) -> Result<Json<ApiResponse<CheckoutPayload>>, AppError> {
    let missing =
        || AppError::Validation("User ID, plan type, and email are required".to_string());
    let user_id = non_blank(&request.user_id).ok_or_else(missing)?;
    let plan_type = non_blank(&request.plan_type).ok_or_else(missing)?;
    let email = non_blank(&request.email).ok_or_else(missing)?;

    let plan = state.plans.get(plan_type.parse::<PlanType>()?);

    let customer_id = state
        .payments
        .create_customer(email, user_id)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let success_url = format!(
        "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
        state.config.client_url
    );
    let cancel_url = format!("{}/payment/cancel", state.config.client_url);

    let session = state
        .payments
        .create_checkout_session(&CheckoutRequest {
            customer_id: &customer_id,
            price_id: &plan.price_id,
            mode: plan.mode,
            success_url: &success_url,
            cancel_url: &cancel_url,
            user_id,
            plan_type: plan.plan_type.as_str(),
        })
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    info!(
        "Created checkout session {} for user {user_id} ({}, ${})",
        session.id, plan.name, plan.price_usd
    );

    Ok(ApiResponse::ok(CheckoutPayload {
        session_id: session.id,
        url: session.url,
    }))
}

/// POST /api/payments/webhook
///
/// Takes the raw body: the signature covers the exact bytes Stripe sent.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing Stripe signature".to_string()))?;

    let now = Utc::now();
    state
        .webhook_verifier
        .verify(&body, signature, now.timestamp())
        .map_err(|e| AppError::Validation(format!("Webhook error: {e}")))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Webhook error: {e}")))?;
    info!("Received webhook event {} ({})", event.id, event.event_type);

    apply_event(state.subscriptions.as_ref(), event.classify(), now).await?;

    Ok(Json(json!({ "received": true })))
}

/// GET /api/payments/subscription/:userId
pub async fn handle_subscription_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<SubscriptionStatus>>, AppError> {
    let status = state
        .subscriptions
        .get(&user_id)
        .await?
        .unwrap_or_else(|| SubscriptionStatus::inactive(&user_id));

    Ok(ApiResponse::ok(status))
}
