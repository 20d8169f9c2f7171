//! Shared setup for integration tests.

#![allow(dead_code)]

use std::path::Path;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use tower::ServiceExt;

use vestibule_site::{AppState, Config, app};
use vestibule_test_utils::{csrf_token, form_body, password_hash, session_cookie};

pub const TEMPLATE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../templates");
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static");

pub const SECRET_KEY: &str = "integration-secret-key-4c1e";
pub const ADMIN_PASSWORD: &str = "correct horse battery";

/// Configuration pointing at the workspace templates, no admin hash.
pub fn config() -> Config {
    Config::new(SECRET_KEY)
        .unwrap()
        .with_template_dir(Path::new(TEMPLATE_DIR).canonicalize().unwrap())
        .with_static_dir(Path::new(STATIC_DIR).canonicalize().unwrap())
}

/// Configuration with `ADMIN_PASSWORD` as the admin credential.
pub fn config_with_admin() -> Config {
    config()
        .with_admin_password_hash(password_hash(ADMIN_PASSWORD))
        .unwrap()
}

/// The full application for the given configuration.
pub fn test_app(config: Config) -> Router {
    app(AppState::new(config).unwrap())
}

pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_form(app: &Router, uri: &str, cookie: Option<&str>, pairs: &[(&str, &str)]) -> Response {
    let mut request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(request.body(Body::from(form_body(pairs))).unwrap())
        .await
        .unwrap()
}

/// GET /login and return the session cookie and CSRF token it issued.
pub async fn login_session(app: &Router) -> (String, String) {
    let response = get(app, "/login").await;
    let cookie = session_cookie(&response).expect("login page should set a session cookie");
    let html = vestibule_test_utils::body_text(response).await;
    let token = csrf_token(&html).expect("login page should contain a CSRF token");
    (cookie, token)
}
