mod advice;
pub mod auth;
pub mod error;
mod requests;
mod users;
mod validation;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session));

    // Admin routes (each handler takes AdminUser, which re-checks the live
    // admin flag per request)
    let admin_routes = Router::new()
        .route("/requests", get(requests::list_requests))
        .route("/requests/:email/approve", post(requests::approve_request))
        .route("/requests/:email/deny", post(requests::deny_request))
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/:email", delete(users::delete_user));

    // Advisory routes (any authenticated session)
    let advice_routes = Router::new()
        .route("/analyze-log", post(advice::analyze_log))
        .route("/troubleshooting-steps", post(advice::troubleshooting_steps))
        .route("/general-help", post(advice::general_help));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/requests", post(requests::submit_request))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/advice", advice_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
