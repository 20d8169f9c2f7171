//! Field validators and validation errors.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

/// A constraint on a single field's submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Value must look like an email address.
    Email,

    /// Value length, in characters, must fall within `min..=max`.
    Length { min: usize, max: usize },

    /// Value must equal the value of another field.
    EqualTo { field: String, message: String },
}

impl Validator {
    /// Message used when a required field is empty.
    pub const REQUIRED_MESSAGE: &'static str = "This field is required.";

    /// Check a value, returning the error message on failure.
    ///
    /// `values` holds every bound value of the form, for cross-field checks.
    pub fn check(&self, value: &str, values: &HashMap<String, String>) -> Result<(), String> {
        match self {
            Validator::Email => {
                if valid_email(value) {
                    Ok(())
                } else {
                    Err("Invalid email address.".to_string())
                }
            }
            Validator::Length { min, max } => {
                let len = value.chars().count();
                if len < *min || len > *max {
                    Err(format!(
                        "Field must be between {min} and {max} characters long."
                    ))
                } else {
                    Ok(())
                }
            }
            Validator::EqualTo { field, message } => {
                let other = values.get(field).map(String::as_str).unwrap_or("");
                if other == value {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            }
        }
    }
}

/// Loose email syntax check: one `@`, no whitespace, a dotted domain.
pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field name (None for form-level errors).
    pub field: Option<String>,

    /// Error message.
    pub message: String,
}

impl ValidationError {
    /// Create a field-level error.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(name.into()),
            message: message.into(),
        }
    }

    /// Create a form-level error.
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("user@example.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
        assert!(!valid_email("user@example"));
        assert!(!valid_email("user example.com"));
        assert!(!valid_email("user@exa mple.com"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("user@example."));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_length_counts_characters() {
        let v = Validator::Length { min: 6, max: 8 };
        let none = HashMap::new();
        assert!(v.check("abcdef", &none).is_ok());
        assert!(v.check("ééééééé", &none).is_ok());
        assert!(v.check("abcde", &none).is_err());
        assert_eq!(
            v.check("abcdefghi", &none),
            Err("Field must be between 6 and 8 characters long.".to_string())
        );
    }

    #[test]
    fn test_equal_to() {
        let v = Validator::EqualTo {
            field: "password".to_string(),
            message: "Passwords must match".to_string(),
        };
        let mut values = HashMap::new();
        values.insert("password".to_string(), "secret1".to_string());

        assert!(v.check("secret1", &values).is_ok());
        assert_eq!(
            v.check("secret2", &values),
            Err("Passwords must match".to_string())
        );
    }

    #[test]
    fn test_validation_error() {
        let field_error = ValidationError::field("email", "Invalid email");
        assert_eq!(field_error.field, Some("email".to_string()));

        let form_error = ValidationError::form("Form expired");
        assert!(form_error.field.is_none());
    }
}
