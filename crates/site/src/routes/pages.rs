//! Static page routes.

use axum::{Router, extract::State, response::Html, routing::get};

use crate::error::AppResult;
use crate::state::AppState;

use super::helpers::{page_context, render_page};

/// Create the pages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
}

/// GET /
async fn home(State(state): State<AppState>) -> AppResult<Html<String>> {
    render_page(&state, "pages/placeholder.home.html", &page_context("Home"))
}

/// GET /about
async fn about(State(state): State<AppState>) -> AppResult<Html<String>> {
    render_page(&state, "pages/placeholder.about.html", &page_context("About"))
}
