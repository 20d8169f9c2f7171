//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::debug;

use crate::config::Config;
use crate::form::{CsrfProtect, FormService};
use crate::routes::REQUIRED_TEMPLATES;
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Immutable process configuration.
    config: Config,

    /// Theme engine for template rendering.
    theme: Arc<ThemeEngine>,

    /// Form service for CSRF and validation.
    forms: FormService,
}

impl AppState {
    /// Create application state, loading templates from the configured
    /// directory. Fails if any template a route renders is missing.
    pub fn new(config: Config) -> Result<Self> {
        let theme = ThemeEngine::new(&config.template_dir)?;

        let missing = theme.missing_templates(REQUIRED_TEMPLATES);
        if !missing.is_empty() {
            bail!(
                "missing templates in {}: {}",
                config.template_dir.display(),
                missing.join(", ")
            );
        }

        debug!(dir = %config.template_dir.display(), "Templates loaded");

        Ok(Self::with_theme(config, theme))
    }

    /// Create application state around an already-built theme.
    pub fn with_theme(config: Config, theme: ThemeEngine) -> Self {
        let theme = Arc::new(theme);
        let csrf = CsrfProtect::new(config.secret_key.clone());
        let forms = FormService::new(csrf, theme.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                theme,
                forms,
            }),
        }
    }

    /// Process configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Theme engine.
    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }

    /// Form service.
    pub fn forms(&self) -> &FormService {
        &self.inner.forms
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("theme", &self.inner.theme)
            .finish()
    }
}
