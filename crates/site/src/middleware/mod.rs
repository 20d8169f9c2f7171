//! HTTP middleware.

mod error_pages;

pub use error_pages::{panic_response, render_error_pages};
