//! Form service: CSRF token issue, submission processing, and rendering.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use tower_sessions::Session;
use tracing::debug;

use crate::theme::ThemeEngine;

use super::csrf::{CSRF_FIELD_NAME, CsrfProtect};
use super::types::Form;
use super::validation::ValidationError;

/// Form service shared by all route handlers.
pub struct FormService {
    csrf: CsrfProtect,
    theme: Arc<ThemeEngine>,
}

impl FormService {
    /// Create a new form service.
    pub fn new(csrf: CsrfProtect, theme: Arc<ThemeEngine>) -> Self {
        Self { csrf, theme }
    }

    /// Prepare an empty form for display, attaching a fresh CSRF token.
    pub async fn build(&self, mut form: Form, session: &Session) -> Result<Form> {
        form.token = self.csrf.generate_token(session).await?;
        Ok(form)
    }

    /// Bind and validate a submission.
    ///
    /// CSRF and field errors are recorded on the form. The form always leaves
    /// with a fresh token so it can be re-rendered and submitted again.
    pub async fn process(
        &self,
        form: &mut Form,
        submitted: &HashMap<String, String>,
        session: &Session,
    ) -> Result<FormResult> {
        form.bind(submitted);

        let token = form.submitted_token().unwrap_or("").to_string();
        let csrf_ok = match self.csrf.verify_token(session, &token).await {
            Ok(()) => true,
            Err(e) if e.is_internal() => bail!(e),
            Err(e) => {
                debug!(form_id = %form.form_id, reason = %e, "CSRF validation failed");
                form.add_error(ValidationError::field(CSRF_FIELD_NAME, e.to_string()));
                false
            }
        };

        let fields_ok = form.validate_fields();

        form.token = self.csrf.generate_token(session).await?;

        if csrf_ok && fields_ok {
            Ok(FormResult::Success)
        } else {
            Ok(FormResult::ValidationFailed)
        }
    }

    /// Render a form to HTML through the theme.
    pub fn render(&self, form: &Form) -> Result<String> {
        self.theme.render_form(form)
    }
}

impl std::fmt::Debug for FormService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormService").finish()
    }
}

/// Result of form processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormResult {
    /// CSRF token and every field validated.
    Success,

    /// Re-display form with errors.
    ValidationFailed,
}

impl FormResult {
    /// Whether the submission passed validation.
    pub fn is_success(self) -> bool {
        self == FormResult::Success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::form::definitions::login_form;
    use secrecy::SecretString;
    use tower_sessions::MemoryStore;

    fn service() -> FormService {
        FormService::new(
            CsrfProtect::new(SecretString::from("service-test-key")),
            Arc::new(ThemeEngine::empty()),
        )
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn submitted(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_build_attaches_token() {
        let forms = service();
        let session = session();
        let form = forms.build(login_form(), &session).await.unwrap();
        assert!(!form.token.is_empty());

        let again = forms.build(login_form(), &session).await.unwrap();
        let secret = |t: &str| t.split('.').next().unwrap().to_string();
        assert_eq!(secret(&form.token), secret(&again.token));
    }

    #[tokio::test]
    async fn test_process_success() {
        let forms = service();
        let session = session();
        let form = forms.build(login_form(), &session).await.unwrap();

        let mut posted = login_form();
        let result = forms
            .process(
                &mut posted,
                &submitted(&[
                    ("name", "admin"),
                    ("password", "pw"),
                    ("csrf_token", form.token.as_str()),
                ]),
                &session,
            )
            .await
            .unwrap();

        assert_eq!(result, FormResult::Success);
        assert!(!posted.has_errors());
        assert!(!posted.token.is_empty());
    }

    #[tokio::test]
    async fn test_process_missing_token() {
        let forms = service();
        let session = session();
        let _ = forms.build(login_form(), &session).await.unwrap();

        let mut posted = login_form();
        let result = forms
            .process(
                &mut posted,
                &submitted(&[("name", "admin"), ("password", "pw")]),
                &session,
            )
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(
            posted.field_errors(CSRF_FIELD_NAME),
            ["The CSRF token is missing."]
        );
    }

    #[tokio::test]
    async fn test_process_without_session_secret() {
        let forms = service();
        let other = session();
        let token = forms.build(login_form(), &other).await.unwrap().token;

        let mut posted = login_form();
        let result = forms
            .process(
                &mut posted,
                &submitted(&[("name", "a"), ("password", "b"), ("csrf_token", token.as_str())]),
                &session(),
            )
            .await
            .unwrap();

        assert_eq!(result, FormResult::ValidationFailed);
        assert_eq!(
            posted.field_errors(CSRF_FIELD_NAME),
            ["The CSRF session token is missing."]
        );
    }

    #[tokio::test]
    async fn test_process_session_store_failure_is_error() {
        let forms = service();
        let token = forms.build(login_form(), &session()).await.unwrap().token;

        let mut posted = login_form();
        let result = forms
            .process(
                &mut posted,
                &submitted(&[("name", "a"), ("password", "b"), ("csrf_token", token.as_str())]),
                &vestibule_test_utils::unreachable_session(),
            )
            .await;

        assert!(result.is_err());
    }
}
