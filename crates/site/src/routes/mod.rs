//! HTTP route handlers.

pub mod auth;
pub mod errors;
pub mod helpers;
pub mod pages;
pub mod static_files;

/// Templates that must be present for every route to render.
///
/// Checked once at startup so a broken theme fails before the listener binds.
pub const REQUIRED_TEMPLATES: &[&str] = &[
    "layouts/main.html",
    "pages/placeholder.home.html",
    "pages/placeholder.about.html",
    "forms/login.html",
    "forms/register.html",
    "forms/forgot.html",
    "errors/404.html",
    "errors/500.html",
    "form/form.html",
    "form/textfield.html",
    "form/email.html",
    "form/password.html",
    "form/hidden.html",
    "form/submit.html",
];
