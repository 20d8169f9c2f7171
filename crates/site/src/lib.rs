//! Vestibule
//!
//! A small site front-end: a handful of pages, login/register/forgot forms
//! with CSRF protection, and themed error pages.

pub mod config;
pub mod credentials;
pub mod error;
pub mod form;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod theme;

use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};

pub use config::Config;
pub use session::MokaSessionStore;
pub use state::AppState;

/// Build the application with all middleware applied.
pub fn app(state: AppState) -> Router {
    with_layers(router(), state)
}

/// All routes plus the 404 fallback, without middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(routes::pages::router())
        .merge(routes::auth::router())
        .merge(routes::static_files::router())
        .fallback(routes::errors::not_found)
}

/// Wrap a router in the session, panic and error page layers.
pub fn with_layers(router: Router<AppState>, state: AppState) -> Router {
    let config = state.config();
    let session_layer = SessionManagerLayer::new(MokaSessionStore::default())
        .with_secure(config.session_cookie_secure)
        .with_http_only(true)
        .with_same_site(config.cookie_same_site)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            session::SESSION_IDLE_SECS as i64,
        )));

    router
        // Middleware layers (last added = first executed in request flow):
        // TraceLayer → error pages → panic catcher → session → routes
        .layer(session_layer)
        .layer(CatchPanicLayer::custom(middleware::panic_response))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
