//! Admin user management.

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
use crate::store::UserResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// List users
///
/// GET /api/admin/users
pub async fn list_users(
    AdminUser(_): AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<UserResponse>> {
    let users = state
        .store
        .list_users()
        .await
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Json(users)
}

/// Create a user directly, bypassing the request workflow
///
/// POST /api/admin/users
pub async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
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

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = state
        .store
        .create_user(&request.name, &request.email, &password_hash, request.is_admin)
        .await?;

    tracing::info!(email = %user.email, created_by = %admin.email, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Delete a user. The root administrator is protected.
///
/// DELETE /api/admin/users/:email
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_user(&email).await?;
    tracing::info!(email = %email, deleted_by = %admin.email, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
