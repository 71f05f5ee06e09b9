//! Account request workflow.
//!
//! Submission is open to unauthenticated visitors; listing, approval, and
//! denial are admin-only. Per email the lifecycle is NONE -> PENDING ->
//! approved-into-users or discarded, and a denied email may submit a fresh
//! request later.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::{hash_password, AdminUser};
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::store::{RequestResponse, UserResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Submit an account request
///
/// POST /api/requests
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_name(&request.name) {
        errors.add("name", e);
    }
    if let Err(e) = validation::validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validation::validate_password(&request.password) {
        errors.add("password", e);
    }
    errors.finish()?;

    // The requested secret is hashed at the door; the store never holds
    // plaintext, not even for pending requests.
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let created = state
        .store
        .create_request(&request.name, &request.email, &password_hash)
        .await?;

    tracing::info!(email = %created.email, "Account request submitted");
    Ok((StatusCode::CREATED, Json(RequestResponse::from(created))))
}

/// List pending account requests
///
/// GET /api/admin/requests
pub async fn list_requests(
    AdminUser(_): AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<RequestResponse>> {
    let requests = state
        .store
        .list_requests()
        .await
        .into_iter()
        .map(RequestResponse::from)
        .collect();
    Json(requests)
}

/// Approve a pending request, promoting it to a non-admin user
///
/// POST /api/admin/requests/:email/approve
pub async fn approve_request(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.store.approve_request(&email).await?;
    tracing::info!(email = %email, approved_by = %admin.email, "Request approved");
    Ok(Json(UserResponse::from(user)))
}

/// Deny a pending request
///
/// POST /api/admin/requests/:email/deny
pub async fn deny_request(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.deny_request(&email).await?;
    tracing::info!(email = %email, denied_by = %admin.email, "Request denied");
    Ok(StatusCode::NO_CONTENT)
}
