//! The site's form schemas: login, register, and forgot-password.

use super::csrf::CSRF_FIELD_NAME;
use super::types::{Form, FormElement};

/// Example address shown in empty email inputs.
pub const EMAIL_PLACEHOLDER: &str = "you@example.com";

/// Login form: username and password.
pub fn login_form() -> Form {
    Form::new("login")
        .title("Login")
        .action("/login")
        .element(
            "name",
            FormElement::textfield()
                .title("Username")
                .required()
                .weight(0),
        )
        .element(
            "password",
            FormElement::password()
                .title("Password")
                .required()
                .weight(10),
        )
        .element(CSRF_FIELD_NAME, FormElement::hidden().weight(90))
        .element("submit", FormElement::submit("Login").weight(100))
}

/// Registration form.
pub fn register_form() -> Form {
    Form::new("register")
        .title("Register")
        .action("/register")
        .element(
            "name",
            FormElement::textfield()
                .title("Username")
                .required()
                .length(6, 25)
                .weight(0),
        )
        .element(
            "email",
            FormElement::email()
                .title("Email")
                .placeholder(EMAIL_PLACEHOLDER)
                .required()
                .length(6, 40)
                .weight(10),
        )
        .element(
            "password",
            FormElement::password()
                .title("Password")
                .required()
                .length(6, 40)
                .weight(20),
        )
        .element(
            "confirm",
            FormElement::password()
                .title("Repeat Password")
                .required()
                .equal_to("password", "Passwords must match")
                .weight(30),
        )
        .element(CSRF_FIELD_NAME, FormElement::hidden().weight(90))
        .element("submit", FormElement::submit("Register").weight(100))
}

/// Forgot-password form.
pub fn forgot_form() -> Form {
    Form::new("forgot")
        .title("Forgot Password")
        .action("/forgot")
        .element(
            "email",
            FormElement::email()
                .title("Email")
                .description("Enter the email address you registered with.")
                .placeholder(EMAIL_PLACEHOLDER)
                .required()
                .length(6, 40)
                .weight(0),
        )
        .element(CSRF_FIELD_NAME, FormElement::hidden().weight(90))
        .element("submit", FormElement::submit("Submit").weight(100))
}
