//! Form and form element types.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::csrf::CSRF_FIELD_NAME;
use super::validation::{ValidationError, Validator};

/// A form definition bound to one request's submitted data.
#[derive(Clone, Serialize)]
pub struct Form {
    /// Unique form identifier (e.g., "login").
    pub form_id: String,

    /// Form action URL.
    pub action: String,

    /// HTTP method ("post" or "get").
    pub method: String,

    /// Optional form title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Form elements keyed by name.
    pub elements: BTreeMap<String, FormElement>,

    /// CSRF token rendered into the hidden token field.
    pub token: String,

    /// Field-level error messages keyed by element name.
    pub errors: BTreeMap<String, Vec<String>>,

    /// Errors that belong to the form as a whole.
    pub form_errors: Vec<String>,

    /// Submitted values. Never serialized: password values must not reach
    /// templates, and [`Form::display_value`] filters them.
    #[serde(skip)]
    values: HashMap<String, String>,
}

impl Form {
    /// Create a new form with the given ID.
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            action: String::new(),
            method: "post".to_string(),
            title: None,
            elements: BTreeMap::new(),
            token: String::new(),
            errors: BTreeMap::new(),
            form_errors: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Set the form action URL.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Set the form title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add an element to the form.
    pub fn element(mut self, name: impl Into<String>, element: FormElement) -> Self {
        self.elements.insert(name.into(), element);
        self
    }

    /// Get elements sorted by weight.
    pub fn sorted_elements(&self) -> Vec<(&String, &FormElement)> {
        let mut elements: Vec<_> = self.elements.iter().collect();
        elements.sort_by_key(|(_, el)| el.weight);
        elements
    }

    /// Copy submitted data for the declared elements into the form.
    ///
    /// Unknown keys are ignored. The submitted CSRF token is kept as a value
    /// so it can be checked; [`Form::token`] is only ever set by the server.
    pub fn bind(&mut self, submitted: &HashMap<String, String>) {
        self.values.clear();
        for name in self.elements.keys() {
            if let Some(value) = submitted.get(name) {
                self.values.insert(name.clone(), value.clone());
            }
        }
    }

    /// The submitted value of a field.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The submitted CSRF token, if any.
    pub fn submitted_token(&self) -> Option<&str> {
        self.value(CSRF_FIELD_NAME)
    }

    /// The value to echo back into a rendered field.
    ///
    /// Password, hidden, and submit elements never echo submitted data.
    pub fn display_value(&self, name: &str) -> Option<&str> {
        let element = self.elements.get(name)?;
        match element.element_type {
            ElementType::Textfield { .. } | ElementType::Email => self.value(name),
            ElementType::Password | ElementType::Hidden | ElementType::Submit { .. } => None,
        }
    }

    /// Run every element's validators against the bound values.
    ///
    /// Returns `true` when no field produced an error.
    pub fn validate_fields(&mut self) -> bool {
        let mut found = Vec::new();

        for (name, element) in &self.elements {
            let value = self.values.get(name).map(String::as_str).unwrap_or("");

            if element.required && value.trim().is_empty() {
                found.push(ValidationError::field(name, Validator::REQUIRED_MESSAGE));
                continue;
            }

            for validator in &element.validators {
                if let Err(message) = validator.check(value, &self.values) {
                    found.push(ValidationError::field(name, message));
                }
            }
        }

        let valid = found.is_empty();
        for error in found {
            self.add_error(error);
        }
        valid
    }

    /// Record a validation error on its field, or on the form itself.
    pub fn add_error(&mut self, error: ValidationError) {
        match error.field {
            Some(field) => self.errors.entry(field).or_default().push(error.message),
            None => self.form_errors.push(error.message),
        }
    }

    /// Whether any field or form-level error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.form_errors.is_empty() || self.errors.values().any(|e| !e.is_empty())
    }

    /// Error messages recorded for a field.
    pub fn field_errors(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut submitted: Vec<_> = self.values.keys().collect();
        submitted.sort();

        f.debug_struct("Form")
            .field("form_id", &self.form_id)
            .field("action", &self.action)
            .field("method", &self.method)
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .field("submitted", &submitted)
            .field("errors", &self.errors)
            .field("form_errors", &self.form_errors)
            .finish()
    }
}

/// A form element definition.
#[derive(Debug, Clone, Serialize)]
pub struct FormElement {
    /// Element type with type-specific configuration.
    #[serde(flatten)]
    pub element_type: ElementType,

    /// Element title/label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Element description/help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether this field is required.
    #[serde(default)]
    pub required: bool,

    /// Sort weight (lower = appears first).
    #[serde(default)]
    pub weight: i32,

    /// Placeholder text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    /// Validators run after the required check.
    #[serde(skip)]
    pub validators: Vec<Validator>,
}

impl FormElement {
    /// Create a textfield element.
    pub fn textfield() -> Self {
        Self::new(ElementType::Textfield { max_length: None })
    }

    /// Create an email input.
    pub fn email() -> Self {
        Self::new(ElementType::Email).validator(Validator::Email)
    }

    /// Create a password field.
    pub fn password() -> Self {
        Self::new(ElementType::Password)
    }

    /// Create a hidden field.
    pub fn hidden() -> Self {
        Self::new(ElementType::Hidden)
    }

    /// Create a submit button.
    pub fn submit(value: impl Into<String>) -> Self {
        Self::new(ElementType::Submit {
            value: value.into(),
        })
    }

    fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            title: None,
            description: None,
            required: false,
            weight: 0,
            placeholder: None,
            validators: Vec::new(),
        }
    }

    /// Set the element title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the element description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the weight.
    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Set placeholder text.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Constrain the value length (in characters).
    ///
    /// Textfields also get a matching `maxlength` attribute.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        if let ElementType::Textfield { ref mut max_length } = self.element_type {
            *max_length = Some(max);
        }
        self.validator(Validator::Length { min, max })
    }

    /// Require the value to equal another field's value.
    pub fn equal_to(self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.validator(Validator::EqualTo {
            field: field.into(),
            message: message.into(),
        })
    }

    /// Append a validator.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }
}

/// Element type variants with type-specific configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementType {
    /// Single-line text input.
    Textfield {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },

    /// Email address input.
    Email,

    /// Password field.
    Password,

    /// Hidden field.
    Hidden,

    /// Submit button.
    Submit { value: String },
}

impl ElementType {
    /// Type name, which is also the element's template name under `form/`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementType::Textfield { .. } => "textfield",
            ElementType::Email => "email",
            ElementType::Password => "password",
            ElementType::Hidden => "hidden",
            ElementType::Submit { .. } => "submit",
        }
    }
}
