//! Shared route helpers for page rendering.

use axum::response::Html;

use crate::error::AppResult;
use crate::form::Form;
use crate::state::AppState;

/// Base template context for a page with the given title.
pub fn page_context(title: &str) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("title", title);
    context
}

/// Render a full page template.
pub fn render_page(state: &AppState, template: &str, context: &tera::Context) -> AppResult<Html<String>> {
    Ok(Html(state.theme().render(template, context)?))
}

/// Render a form into its page template.
///
/// The form markup is inserted as `form_html`; the form itself is exposed as
/// `form` for templates that want its title or errors.
pub fn render_form_page(state: &AppState, template: &str, form: &Form) -> AppResult<Html<String>> {
    let form_html = state.forms().render(form)?;

    let mut context = page_context(form.title.as_deref().unwrap_or_default());
    context.insert("form", form);
    context.insert("form_html", &form_html);

    render_page(state, template, &context)
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
