//! Theme engine with Tera templates and suggestion resolution.

use std::path::Path;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tera::Tera;
use tracing::debug;

use crate::form::{CSRF_FIELD_NAME, Form, FormElement};

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
    /// Cache mapping suggestion lists to resolved template names.
    suggestion_cache: DashMap<String, String>,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), "loaded templates");

        Ok(Self {
            tera,
            suggestion_cache: DashMap::new(),
        })
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Self {
        Self {
            tera: Tera::default(),
            suggestion_cache: DashMap::new(),
        }
    }

    /// Get a mutable reference to Tera (for adding templates at runtime).
    pub fn tera_mut(&mut self) -> &mut Tera {
        &mut self.tera
    }

    /// Names from `required` that are not loaded.
    pub fn missing_templates<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.tera.get_template(name).is_err())
            .collect()
    }

    /// Resolve the best template from a list of suggestions.
    ///
    /// Templates are tried in order; the first one that exists is returned.
    /// Results are cached.
    ///
    /// Example suggestions: `["form/form--login", "form/form"]`
    pub fn resolve_template(&self, suggestions: &[&str]) -> Option<String> {
        if suggestions.is_empty() {
            return None;
        }

        let cache_key = suggestions.join("|");

        if let Some(cached) = self.suggestion_cache.get(&cache_key) {
            return Some(cached.clone());
        }

        for suggestion in suggestions {
            let template_name = format!("{suggestion}.html");
            if self.tera.get_template(&template_name).is_ok() {
                self.suggestion_cache
                    .insert(cache_key, template_name.clone());
                return Some(template_name);
            }

            // Also try without .html extension (in case suggestion already has it)
            if self.tera.get_template(suggestion).is_ok() {
                let name = (*suggestion).to_string();
                self.suggestion_cache.insert(cache_key, name.clone());
                return Some(name);
            }
        }

        // Negative results are not cached so templates added later resolve.
        None
    }

    /// Render a named template.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template: {template}"))
    }

    /// Render a form to HTML.
    pub fn render_form(&self, form: &Form) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("form", form);

        let elements_html = self.render_form_elements(form)?;
        context.insert("elements", &elements_html);

        let specific = format!("form/form--{}", form.form_id);
        let template = self
            .resolve_template(&[specific.as_str(), "form/form"])
            .unwrap_or_else(|| "form/form.html".to_string());

        self.tera
            .render(&template, &context)
            .context("failed to render form template")
    }

    /// Render form elements to HTML, ordered by weight.
    fn render_form_elements(&self, form: &Form) -> Result<String> {
        let mut html = String::new();

        for (name, element) in form.sorted_elements() {
            html.push_str(&self.render_form_element(form, name, element)?);
        }

        Ok(html)
    }

    /// Render a single form element to HTML.
    fn render_form_element(&self, form: &Form, name: &str, element: &FormElement) -> Result<String> {
        let template_name = format!("form/{}.html", element.element_type.type_name());

        let value = if name == CSRF_FIELD_NAME {
            Some(form.token.as_str())
        } else {
            form.display_value(name)
        };

        let mut context = tera::Context::new();
        context.insert("form_id", &form.form_id);
        context.insert("name", name);
        context.insert("element", element);
        context.insert("value", &value.unwrap_or(""));
        context.insert("errors", form.field_errors(name));

        self.tera
            .render(&template_name, &context)
            .with_context(|| format!("failed to render form element: {name}"))
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .field("cache_size", &self.suggestion_cache.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::form::{ValidationError, login_form};

    fn engine_with_form_templates() -> ThemeEngine {
        let mut engine = ThemeEngine::empty();
        engine
            .tera_mut()
            .add_raw_templates(vec![
                (
                    "form/form.html",
                    "<form id=\"{{ form.form_id }}\" action=\"{{ form.action }}\">\
                     {% for e in form.form_errors %}<p class=\"form-error\">{{ e }}</p>{% endfor %}\
                     {{ elements | safe }}</form>",
                ),
                (
                    "form/textfield.html",
                    "<input type=\"text\" name=\"{{ name }}\" value=\"{{ value }}\">\
                     {% for e in errors %}<span>{{ e }}</span>{% endfor %}",
                ),
                ("form/email.html", "<input type=\"email\" name=\"{{ name }}\" value=\"{{ value }}\">"),
                ("form/password.html", "<input type=\"password\" name=\"{{ name }}\" value=\"{{ value }}\">"),
                ("form/hidden.html", "<input type=\"hidden\" name=\"{{ name }}\" value=\"{{ value }}\">"),
                ("form/submit.html", "<button>{{ element.value }}</button>"),
            ])
            .unwrap();
        engine
    }

    #[test]
    fn test_theme_engine_empty() {
        let engine = ThemeEngine::empty();
        assert!(engine.resolve_template(&["nonexistent"]).is_none());
        assert!(engine.resolve_template(&[]).is_none());
    }

    #[test]
    fn test_resolve_template_prefers_first_match() {
        let mut engine = ThemeEngine::empty();
        engine
            .tera_mut()
            .add_raw_templates(vec![("a.html", "A"), ("b.html", "B")])
            .unwrap();

        assert_eq!(
            engine.resolve_template(&["missing", "b", "a"]),
            Some("b.html".to_string())
        );
        assert_eq!(engine.resolve_template(&["a.html"]), Some("a.html".to_string()));
    }

    #[test]
    fn test_missing_templates() {
        let mut engine = ThemeEngine::empty();
        engine.tera_mut().add_raw_template("present.html", "x").unwrap();
        assert_eq!(
            engine.missing_templates(&["present.html", "absent.html"]),
            vec!["absent.html"]
        );
    }

    #[test]
    fn test_render_form_orders_elements() {
        let engine = engine_with_form_templates();
        let mut form = login_form();
        form.token = "tok.1.sig".to_string();

        let html = engine.render_form(&form).unwrap();
        let name = html.find("name=\"name\"").unwrap();
        let password = html.find("name=\"password\"").unwrap();
        let token = html.find("name=\"csrf_token\" value=\"tok.1.sig\"").unwrap();
        let submit = html.find("<button>Login</button>").unwrap();
        assert!(name < password && password < token && token < submit);
    }

    #[test]
    fn test_render_form_never_echoes_password() {
        let engine = engine_with_form_templates();
        let mut form = login_form();
        let submitted: HashMap<String, String> = [
            ("name".to_string(), "alice".to_string()),
            ("password".to_string(), "hunter22".to_string()),
        ]
        .into_iter()
        .collect();
        form.bind(&submitted);
        form.add_error(ValidationError::form("Invalid username or password."));

        let html = engine.render_form(&form).unwrap();
        assert!(html.contains("value=\"alice\""));
        assert!(!html.contains("hunter22"));
        assert!(html.contains("Invalid username or password."));
    }

    #[test]
    fn test_render_form_escapes_values() {
        let engine = engine_with_form_templates();
        let mut form = login_form();
        let submitted: HashMap<String, String> =
            [("name".to_string(), "<script>".to_string())].into_iter().collect();
        form.bind(&submitted);

        let html = engine.render_form(&form).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
