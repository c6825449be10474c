//! Axum route handlers for the Users API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::{non_blank, ApiJson, ApiResponse};
use crate::errors::AppError;
use crate::payments::store::SubscriptionState;
use crate::state::AppState;
use crate::users::extract::AuthUser;
use crate::users::password::{hash_password, verify_password};
use crate::users::store::{UserProfile, UserRecord};

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returned by both register and login.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub id: String,
    pub name: String,
    pub email: String,
    pub token: String,
}

/// POST /api/users/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthPayload>>), AppError> {
    let missing = || AppError::Validation("Name, email, and password are required".to_string());
    let name = non_blank(&request.name).ok_or_else(missing)?.to_string();
    let email = non_blank(&request.email).ok_or_else(missing)?.to_lowercase();
    // Passwords are taken verbatim; only an empty one is rejected.
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(missing)?;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))?;

    let user = UserRecord::new(Uuid::new_v4().to_string(), name, email, password_hash);
    state.users.create(user.clone()).await?;

    let token = state
        .tokens
        .issue(&user.id, &user.email)
        .map_err(|e| AppError::Internal(e.into()))?;
    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(AuthPayload {
            id: user.id,
            name: user.name,
            email: user.email,
            token,
        }),
    ))
}

/// POST /api/users/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthPayload>>, AppError> {
    let missing = || AppError::Validation("Email and password are required".to_string());
    let email = non_blank(&request.email).ok_or_else(missing)?.to_lowercase();
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(missing)?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
    let user = state.users.find_by_email(&email).await?.ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))?;
    if !matches {
        return Err(invalid());
    }

    let token = state
        .tokens
        .issue(&user.id, &user.email)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(ApiResponse::ok(AuthPayload {
        id: user.id,
        name: user.name,
        email: user.email,
        token,
    }))
}

/// GET /api/users/profile
///
/// An active subscription overrides the sign-up plan.
pub async fn handle_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let user = state
        .users
        .find_by_id(&auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.id)))?;

    let mut profile = UserProfile::from(user);
    if let Some(subscription) = state.subscriptions.get(&profile.id).await? {
        if subscription.status == SubscriptionState::Active {
            profile.plan = subscription.plan;
        }
    }

    Ok(ApiResponse::ok(profile))
}
