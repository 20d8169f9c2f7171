//! Error page middleware.
//!
//! Handlers, the router fallback and the panic catcher all produce bare
//! 404/500 responses. This layer swaps their bodies for the themed error
//! templates while keeping the status code.

use std::any::Any;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::routes::helpers::{html_escape, page_context};
use crate::state::AppState;

/// Replace 404 and 500 response bodies with the matching template.
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    let (template, title) = match response.status() {
        StatusCode::NOT_FOUND => ("errors/404.html", "Page Not Found"),
        StatusCode::INTERNAL_SERVER_ERROR => ("errors/500.html", "Server Error"),
        _ => return response,
    };

    let html = match state.theme().render(template, &page_context(title)) {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, template, "failed to render error page");
            fallback_page(response.status(), title)
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    Response::from_parts(parts, Body::from(html))
}

/// Response for a handler panic, used with `CatchPanicLayer::custom`.
///
/// The panic message is logged; the client only sees a 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = message, "request handler panicked");

    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Minimal page used when the error template itself cannot be rendered.
fn fallback_page(status: StatusCode, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>{title}</title></head>
<body><h1>{code}</h1><p>{title}</p></body></html>"#,
        title = html_escape(title),
        code = status.as_u16(),
    )
}
