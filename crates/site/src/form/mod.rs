//! Declarative forms with validation and CSRF protection.
//!
//! Forms are rendered through the theme engine (Tera templates). The form
//! system supports:
//! - Declarative form definition with typed elements
//! - Signed, time-limited CSRF tokens bound to the session
//! - Server-side validation (required, email, length, equal-to)

pub mod csrf;
pub mod definitions;
mod service;
mod types;
mod validation;

pub use csrf::{CSRF_FIELD_NAME, CsrfError, CsrfProtect};
pub use definitions::{forgot_form, login_form, register_form};
pub use service::{FormResult, FormService};
pub use types::{ElementType, Form, FormElement};
pub use validation::{ValidationError, Validator, valid_email};
