//! HTTP-level tests driving the full router with a stub advisory service.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use modresolve::advisor::{
    AdvisorError, AdvisoryService, AnalyzeLogRequest, HelpAnswer, HelpRequest, LogAnalysis,
    StepsRequest, TroubleshootingGuide,
};
use modresolve::api::auth::hash_password;
use modresolve::config::Config;
use modresolve::store::{RootAdmin, Store};
use modresolve::{api, AppState};

const ADMIN_EMAIL: &str = "admin@modresolve.test";
const ADMIN_PASSWORD: &str = "admin-password";

struct StubAdvisor;

#[async_trait::async_trait]
impl AdvisoryService for StubAdvisor {
    async fn analyze_error_log(
        &self,
        input: AnalyzeLogRequest,
    ) -> Result<LogAnalysis, AdvisorError> {
        Ok(LogAnalysis {
            root_cause: format!(
                "Missing Fabric API on Minecraft {}",
                input.minecraft_version
            ),
            potential_solutions: "Install the matching Fabric API version".to_string(),
        })
    }

    async fn troubleshooting_steps(
        &self,
        input: StepsRequest,
    ) -> Result<TroubleshootingGuide, AdvisorError> {
        Ok(TroubleshootingGuide {
            steps: format!("1. Read the analysis: {}", input.analysis),
        })
    }

    async fn general_help(&self, input: HelpRequest) -> Result<HelpAnswer, AdvisorError> {
        Ok(HelpAnswer {
            answer: format!("Answer to: {}", input.question),
        })
    }
}

/// Advisor that always fails, for checking the generic error surface.
struct FailingAdvisor;

#[async_trait::async_trait]
impl AdvisoryService for FailingAdvisor {
    async fn analyze_error_log(
        &self,
        _input: AnalyzeLogRequest,
    ) -> Result<LogAnalysis, AdvisorError> {
        Err(AdvisorError::Malformed("provider internals leaked".into()))
    }

    async fn troubleshooting_steps(
        &self,
        _input: StepsRequest,
    ) -> Result<TroubleshootingGuide, AdvisorError> {
        Err(AdvisorError::Malformed("provider internals leaked".into()))
    }

    async fn general_help(&self, _input: HelpRequest) -> Result<HelpAnswer, AdvisorError> {
        Err(AdvisorError::Malformed("provider internals leaked".into()))
    }
}

async fn test_app_with(advisor: Arc<dyn AdvisoryService>) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.server.data_dir = dir.path().to_path_buf();
    config.auth.session_secret = "integration-test-secret".to_string();
    config.auth.admin_email = ADMIN_EMAIL.to_string();

    let store = Store::open(
        dir.path(),
        RootAdmin {
            name: "Admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
        },
    )
    .await
    .unwrap();

    let state = Arc::new(AppState::new(config, store, advisor));
    (api::create_router(state), dir)
}

async fn test_app() -> (Router, TempDir) {
    test_app_with(Arc::new(StubAdvisor)).await
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_session(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in and return the `session=...` cookie pair.
async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login should set the session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_check_is_public() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn account_request_lifecycle() {
    let (app, _dir) = test_app().await;

    // Unauthenticated visitor submits a request.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/requests",
            json!({ "name": "Ann", "email": "ann@x.com", "password": "s3cret1!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // A second request for the same email conflicts.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/requests",
            json!({ "name": "Ann Again", "email": "ann@x.com", "password": "s3cret2!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Admin sees the pending request.
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/admin/requests").body(Body::empty()).unwrap(),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let requests = body_json(response).await;
    assert_eq!(requests.as_array().unwrap().len(), 1);
    assert_eq!(requests[0]["email"], "ann@x.com");
    // The pending secret never crosses the API boundary.
    assert!(requests[0].get("password_hash").is_none());

    // Approve it.
    let response = app
        .clone()
        .oneshot(with_session(
            json_request("POST", "/api/admin/requests/ann@x.com/approve", json!({})),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await;
    assert_eq!(user["email"], "ann@x.com");
    assert_eq!(user["is_admin"], false);

    // The request list is empty now.
    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/admin/requests").body(Body::empty()).unwrap(),
            &admin_cookie,
        ))
        .await
        .unwrap();
    let requests = body_json(response).await;
    assert!(requests.as_array().unwrap().is_empty());

    // Ann can log in with the password she requested.
    let ann_cookie = login(&app, "ann@x.com", "s3cret1!").await;
    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/auth/session").body(Body::empty()).unwrap(),
            &ann_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    assert_eq!(session["user"]["email"], "ann@x.com");
    assert_eq!(session["user"]["is_admin"], false);
}

#[tokio::test]
async fn denied_request_is_discarded() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/requests",
            json!({ "name": "Ann", "email": "ann@x.com", "password": "s3cret1!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(with_session(
            json_request("POST", "/api/admin/requests/ann@x.com/deny", json!({})),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Denial is idempotent.
    let response = app
        .clone()
        .oneshot(with_session(
            json_request("POST", "/api/admin/requests/ann@x.com/deny", json!({})),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The denied email never became a user.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "ann@x.com", "password": "s3cret1!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_validation_reports_fields() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/requests",
            json!({ "name": "", "email": "not-an-email", "password": "short" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    let details = body["error"]["details"].as_object().unwrap();
    assert!(details.contains_key("name"));
    assert!(details.contains_key("email"));
    assert!(details.contains_key("password"));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, _dir) = test_app().await;

    let wrong_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    let unknown_email = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": "nobody@x.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn admin_login_rejects_non_admins_generically() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/admin/users",
                json!({ "name": "Bob", "email": "bob@x.com", "password": "bobs-password" }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let non_admin = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/admin/login",
            json!({ "email": "bob@x.com", "password": "bobs-password" }),
        ))
        .await
        .unwrap();
    let bad_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/admin/login",
            json!({ "email": "bob@x.com", "password": "wrong" }),
        ))
        .await
        .unwrap();

    assert_eq!(non_admin.status(), StatusCode::UNAUTHORIZED);
    let a = body_json(non_admin).await;
    let b = body_json(bad_password).await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn admin_routes_require_admin_session() {
    let (app, _dir) = test_app().await;

    // No session at all.
    let response = app
        .clone()
        .oneshot(Request::get("/api/admin/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A valid non-admin session is forbidden.
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    app.clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/admin/users",
                json!({ "name": "Bob", "email": "bob@x.com", "password": "bobs-password" }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    let bob_cookie = login(&app, "bob@x.com", "bobs-password").await;

    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/admin/users").body(Body::empty()).unwrap(),
            &bob_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn root_admin_cannot_be_deleted_via_api() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(with_session(
            Request::delete(format!("/api/admin/users/{}", ADMIN_EMAIL))
                .body(Body::empty())
                .unwrap(),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The admin still works.
    login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
}

#[tokio::test]
async fn deleted_user_loses_access_immediately() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    app.clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/admin/users",
                json!({ "name": "Bob", "email": "bob@x.com", "password": "bobs-password" }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    let bob_cookie = login(&app, "bob@x.com", "bobs-password").await;

    let response = app
        .clone()
        .oneshot(with_session(
            Request::delete("/api/admin/users/bob@x.com")
                .body(Body::empty())
                .unwrap(),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Bob's token has not expired, but the identity behind it is gone.
    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/auth/session").body(Body::empty()).unwrap(),
            &bob_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(with_session(
            Request::post("/api/auth/logout").body(Body::empty()).unwrap(),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The logout response tells the client to drop the cookie.
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    let cleared_pair = cleared.split(';').next().unwrap();
    assert_eq!(cleared_pair.trim(), "session=");

    // A client honoring the removal no longer has a session.
    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/auth/session").body(Body::empty()).unwrap(),
            cleared_pair,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_session_cookie_is_rejected() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    // Flip a character in the signature.
    let mut tampered = admin_cookie.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = app
        .clone()
        .oneshot(with_session(
            Request::get("/api/auth/session").body(Body::empty()).unwrap(),
            &tampered,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn analyze_log_returns_analysis_and_steps() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let error_log = "java.lang.NoClassDefFoundError: net/fabricmc/api/ModInitializer\n\
                     \tat net.minecraft.client.main.Main.main(Main.java:123)";
    let response = app
        .clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/advice/analyze-log",
                json!({
                    "errorLog": error_log,
                    "minecraftVersion": "1.20.1",
                    "modloader": "Forge"
                }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(!body["analysis"]["rootCause"].as_str().unwrap().is_empty());
    assert!(!body["analysis"]["potentialSolutions"]
        .as_str()
        .unwrap()
        .is_empty());
    // The steps were generated from the analysis text.
    assert!(body["steps"]["steps"]
        .as_str()
        .unwrap()
        .contains("Missing Fabric API"));
}

#[tokio::test]
async fn analyze_log_rejects_short_logs() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/advice/analyze-log",
                json!({
                    "errorLog": "crash",
                    "minecraftVersion": "1.20.1",
                    "modloader": "Forge"
                }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn advice_requires_a_session() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/advice/general-help",
            json!({ "question": "How do I install Fabric mods?" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn general_help_passes_history_through() {
    let (app, _dir) = test_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/advice/general-help",
                json!({
                    "question": "Why does it still crash after that?",
                    "history": [
                        { "question": "My game crashes", "answer": "Update your mods" }
                    ]
                }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["answer"]
        .as_str()
        .unwrap()
        .contains("Why does it still crash"));
}

#[tokio::test]
async fn advisor_failures_surface_one_generic_message() {
    let (app, _dir) = test_app_with(Arc::new(FailingAdvisor)).await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(with_session(
            json_request(
                "POST",
                "/api/advice/general-help",
                json!({ "question": "How do I install Fabric mods?" }),
            ),
            &admin_cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "external_service_error");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains("provider internals leaked"));
    assert!(message.contains("try again"));
}
