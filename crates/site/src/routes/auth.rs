//! Authentication form routes (login, register, forgot password).
//!
//! Only login has POST handling. A successful login returns a plain
//! confirmation; no session identity is ever recorded.

use std::collections::HashMap;

use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form as FormData, Router};
use secrecy::ExposeSecret;
use tower_sessions::Session;
use tracing::{debug, info};

use crate::credentials::verify_password;
use crate::error::AppResult;
use crate::form::{Form, ValidationError, forgot_form, login_form, register_form};
use crate::state::AppState;

use super::helpers::render_form_page;

/// Body returned when the submitted credentials match.
pub const LOGIN_SUCCESS: &str = "Login successful";

/// Form-level error shown when the credentials do not match.
pub const LOGIN_FAILED: &str = "Invalid username or password.";

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page))
        .route("/forgot", get(forgot_page))
}

/// GET /login
async fn login_page(State(state): State<AppState>, session: Session) -> AppResult<Html<String>> {
    show_form(&state, &session, login_form(), "forms/login.html").await
}

/// POST /login
///
/// CSRF and field validation run first. The password is only compared
/// against the configured hash once the whole form is valid. A body that
/// is not urlencoded counts as an empty submission.
async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    submitted: Result<FormData<HashMap<String, String>>, FormRejection>,
) -> AppResult<Response> {
    let submitted = match submitted {
        Ok(FormData(submitted)) => submitted,
        Err(rejection) => {
            debug!(%rejection, "login body not parsed as a form");
            HashMap::new()
        }
    };
    let mut form = login_form();
    let result = state.forms().process(&mut form, &submitted, &session).await?;

    if !result.is_success() {
        info!(errors = form.errors.len(), "login form rejected");
        return Ok(render_form_page(&state, "forms/login.html", &form)?.into_response());
    }

    if credentials_match(&state, form.value("password").unwrap_or_default()) {
        info!(username = form.value("name").unwrap_or_default(), "login succeeded");
        return Ok(LOGIN_SUCCESS.into_response());
    }

    info!(username = form.value("name").unwrap_or_default(), "login failed");
    form.add_error(ValidationError::form(LOGIN_FAILED));
    Ok(render_form_page(&state, "forms/login.html", &form)?.into_response())
}

/// Compare a submitted password with the configured admin hash.
///
/// With no hash configured nothing matches.
fn credentials_match(state: &AppState, password: &str) -> bool {
    state
        .config()
        .admin_password_hash
        .as_ref()
        .is_some_and(|hash| verify_password(hash.expose_secret(), password))
}

/// GET /register
async fn register_page(State(state): State<AppState>, session: Session) -> AppResult<Html<String>> {
    show_form(&state, &session, register_form(), "forms/register.html").await
}

/// GET /forgot
async fn forgot_page(State(state): State<AppState>, session: Session) -> AppResult<Html<String>> {
    show_form(&state, &session, forgot_form(), "forms/forgot.html").await
}

/// Attach a CSRF token to an empty form and render it.
async fn show_form(
    state: &AppState,
    session: &Session,
    form: Form,
    template: &str,
) -> AppResult<Html<String>> {
    let form = state.forms().build(form, session).await?;
    render_form_page(state, template, &form)
}
