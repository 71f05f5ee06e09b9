//! Login, logout, and session handling.
//!
//! Passwords are argon2 hashes; the session is a signed HS256 token in an
//! HTTP-only cookie carrying only the non-secret identity projection. Every
//! authenticated request re-resolves the user from the store, so deleted or
//! demoted accounts lose access before the token expires.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::config::AuthConfig;
use crate::store::{User, UserResponse};
use crate::AppState;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";

lazy_static! {
    /// Hash verified against for unknown emails, so a login with a missing
    /// account takes as long as one with a wrong password.
    static ref DUMMY_HASH: String =
        hash_password("modresolve-dummy-credential").expect("hashing a fixed string cannot fail");
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
}

/// Token payload: the non-secret identity projection plus expiry. The
/// admin flag here is informational only; authorization re-checks the
/// store on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub name: String,
    pub admin: bool,
    pub exp: i64,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Sign a session token for a user
pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, ApiError> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(auth.session_days))
        .ok_or_else(|| ApiError::internal("Session expiry overflow"))?
        .timestamp();

    let claims = SessionClaims {
        sub: user.email.clone(),
        name: user.name.clone(),
        admin: user.is_admin,
        exp,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.session_secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to sign session token");
        ApiError::internal("Failed to establish session")
    })
}

/// Decode and verify a session token. Missing, malformed, expired, and
/// badly signed tokens all come back as `None`.
pub fn decode_token(auth: &AuthConfig, token: &str) -> Option<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(auth.session_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

fn session_cookie(auth: &AuthConfig, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(auth.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(auth.session_days))
        .build()
}

/// Resolve the live user behind a request's session cookie, if any.
pub async fn current_session(jar: &CookieJar, state: &AppState) -> Option<User> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();
    let claims = decode_token(&state.config.auth, &token)?;
    // The store is the source of truth for identity and role; the token is
    // only a pointer to it.
    state.store.find_user_by_email(&claims.sub).await
}

async fn authenticate(state: &AppState, request: &LoginRequest) -> Result<User, ApiError> {
    let user = state.store.find_user_by_email(&request.email).await;

    // Always run one verification so unknown emails are indistinguishable
    // from wrong passwords, in timing as well as in the response.
    let verified = match &user {
        Some(user) => verify_password(&request.password, &user.password_hash),
        None => {
            verify_password(&request.password, &DUMMY_HASH);
            false
        }
    };

    if !verified {
        return Err(ApiError::invalid_credentials());
    }
    user.ok_or_else(ApiError::invalid_credentials)
}

/// Login endpoint
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let user = authenticate(&state, &request).await?;

    let token = issue_token(&state.config.auth, &user)?;
    let jar = jar.add(session_cookie(&state.config.auth, token));

    tracing::info!(email = %user.email, "User logged in");
    Ok((
        jar,
        Json(SessionResponse {
            user: UserResponse::from(user),
        }),
    ))
}

/// Administrator login endpoint. A valid non-admin login fails with the
/// same generic error as bad credentials.
///
/// POST /api/auth/admin/login
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let user = authenticate(&state, &request).await?;

    if !user.is_admin {
        return Err(ApiError::invalid_credentials());
    }

    let token = issue_token(&state.config.auth, &user)?;
    let jar = jar.add(session_cookie(&state.config.auth, token));

    tracing::info!(email = %user.email, "Administrator logged in");
    Ok((
        jar,
        Json(SessionResponse {
            user: UserResponse::from(user),
        }),
    ))
}

/// Logout endpoint
///
/// POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, StatusCode::NO_CONTENT)
}

/// Current session endpoint
///
/// GET /api/auth/session
pub async fn session(CurrentUser(user): CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: UserResponse::from(user),
    })
}

/// Extractor for the authenticated user behind the session cookie.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::unauthorized("Authentication required"))?;

        match current_session(&jar, state).await {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

/// Extractor gating admin-only routes. Checks the live admin flag from the
/// store, never the one cached in the token.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            return Err(ApiError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(user))
    }
}
