//! HTTP tests for the security filter
//!
//! Drives the full router with `tower::ServiceExt::oneshot`, the way a
//! browser walks through form login.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use roleguard::config::load_config_from_str;
use roleguard::server::{AppState, build_router};
use tower::ServiceExt;

const CONFIG: &str = r#"
[security]
all_paths = "form"

[[security.paths]]
path = "/onlyManagerRole"
roles = ["Manager"]

[[security.paths]]
path = "/onlyCustomerRole"
roles = ["Customer"]

[[identity.users]]
username = "picketlink"
password = "picketlink"
roles = ["Manager"]

[[identity.users]]
username = "spaced"
password = "p@ss word"
roles = ["Customer"]
"#;

const CONTEXT_CONFIG: &str = r#"
[server]
context_path = "/app"

[security]
all_paths = "form"

[[identity.users]]
username = "picketlink"
password = "picketlink"
"#;

// =============================================================================
// Test Helpers
// =============================================================================

fn app(toml: &str) -> Router {
    app_with_state(toml).0
}

fn app_with_state(toml: &str) -> (Router, AppState) {
    let config = load_config_from_str(toml).unwrap();
    let state = AppState::from_config(&config).unwrap();
    (build_router(state.clone()), state)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn login(uri: &str, username: &str, password: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(format!(
            "j_username={}&j_password={}",
            username, password
        )))
        .unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// `name=value` part of the Set-Cookie header, ready to send back
fn session_cookie(response: &Response<Body>) -> String {
    let raw = response.headers()[header::SET_COOKIE].to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn logged_in(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(login("/j_security_check", "picketlink", "picketlink", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    session_cookie(&response)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_anonymous_request_redirected_to_login() {
    let app = app(CONFIG);

    let response = app.oneshot(get("/onlyManagerRole", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert!(session_cookie(&response).starts_with("ROLEGUARD_SESSION="));
    let raw = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(raw.contains("Max-Age=1800"));
}

#[tokio::test]
async fn test_login_page_is_reachable() {
    let app = app(CONFIG);

    let response = app.oneshot(get("/login", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(r#"action="/j_security_check""#));
    assert!(body.contains("j_username"));
}

#[tokio::test]
async fn test_login_redirects_to_context_root() {
    let app = app(CONFIG);

    let response = app
        .oneshot(login("/j_security_check", "picketlink", "picketlink", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_manager_reaches_manager_path() {
    let app = app(CONFIG);
    let cookie = logged_in(&app).await;

    let response = app
        .oneshot(get("/onlyManagerRole", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "picketlink reached /onlyManagerRole");
}

#[tokio::test]
async fn test_manager_forbidden_from_customer_path() {
    let app = app(CONFIG);
    let cookie = logged_in(&app).await;

    let response = app
        .oneshot(get("/onlyCustomerRole", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failed_login_redirects_to_error_page() {
    let app = app(CONFIG);

    let response = app
        .clone()
        .oneshot(login("/j_security_check", "picketlink", "wrong", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/error");

    let response = app.oneshot(get("/error", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_saved_request_replayed_after_login() {
    let app = app(CONFIG);

    let response = app
        .clone()
        .oneshot(get("/onlyManagerRole?tab=2", None))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(login(
            "/j_security_check",
            "picketlink",
            "picketlink",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), "/onlyManagerRole?tab=2");
    // Session id is replaced on login
    assert_ne!(session_cookie(&response), cookie);
}

#[tokio::test]
async fn test_whoami_reports_principal() {
    let app = app(CONFIG);
    let cookie = logged_in(&app).await;

    let response = app.oneshot(get("/whoami", Some(&cookie))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["principal"]["id"], "picketlink");
    assert_eq!(json["principal"]["roles"][0], "Manager");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = app(CONFIG);
    let cookie = logged_in(&app).await;

    let response = app
        .clone()
        .oneshot(get("/logout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let response = app
        .oneshot(get("/onlyManagerRole", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_context_path_prefixes_targets() {
    let app = app(CONTEXT_CONFIG);

    let response = app.clone().oneshot(get("/app/home", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/app/login");
    assert!(
        response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Path=/app")
    );

    let response = app
        .oneshot(login(
            "/app/j_security_check",
            "picketlink",
            "picketlink",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(location(&response), "/app");
}

#[tokio::test]
async fn test_saved_request_never_leaves_the_site() {
    let app = app(CONFIG);

    let response = app
        .clone()
        .oneshot(get("//evil.example/steal", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(login(
            "/j_security_check",
            "picketlink",
            "picketlink",
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_form_is_url_decoded() {
    let app = app(CONFIG);

    let response = app
        .oneshot(login("/j_security_check", "spaced", "p%40ss+word", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_without_form_body_rejected() {
    let app = app(CONFIG);

    let request = Request::builder()
        .method("POST")
        .uri("/j_security_check")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"j_username":"picketlink"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_oversized_login_form_rejected() {
    let app = app(CONFIG);
    let padding = "a".repeat(32 * 1024);

    let response = app
        .oneshot(login("/j_security_check", "picketlink", &padding, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_anonymous_requests_share_one_session() {
    let (app, state) = app_with_state(CONFIG);

    let response = app.clone().oneshot(get("/page0", None)).await.unwrap();
    let cookie = session_cookie(&response);

    for i in 1..50 {
        let response = app
            .clone()
            .oneshot(get(&format!("/page{}", i), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    assert_eq!(state.filter.sessions().len(), 1);
}
