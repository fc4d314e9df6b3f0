//! Client-side form checks.
//!
//! These only save a round trip; the backend validates every field again.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static STUDENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{4,10}$").expect("regex"));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z\s]{2,50}$").expect("regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex"));

pub const MIN_PASSWORD_LEN: usize = 6;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const STUDENT_ID_MESSAGE: &str = "Student ID must be 4-10 alphanumeric characters";
pub const NAME_MESSAGE: &str = "Name must be 2-50 letters only";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PASSWORD_MESSAGE: &str = "Password must be at least 6 characters";

pub fn validate_student_id(id: &str) -> bool {
    STUDENT_ID.is_match(id)
}

pub fn validate_name(name: &str) -> bool {
    NAME.is_match(name)
}

pub fn validate_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Length is counted in UTF-16 code units, as browsers count it.
pub fn validate_password(password: &str) -> bool {
    password.encode_utf16().count() >= MIN_PASSWORD_LEN
}

/// Strips angle brackets and surrounding whitespace.
pub fn sanitize_input(input: &str) -> String {
    input.replace(['<', '>'], "").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    fields: Vec<FormField>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: value.into(),
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: value.into(),
            required: false,
        });
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Trimmed value of the first field called `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|err| err.field == field)
            .map(|err| err.message.as_str())
    }

    fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|err| format!("{}: {}", err.field, err.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

pub struct FormValidator;

impl FormValidator {
    /// Checks every field and reports all violations together.
    pub fn validate(form: &FormSubmission) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for field in form.fields() {
            let value = field.value.trim();
            if value.is_empty() {
                if field.required {
                    errors.push(&field.name, REQUIRED_MESSAGE);
                }
                continue;
            }
            if let Some(message) = Self::check(&field.name, value) {
                errors.push(&field.name, message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check(name: &str, value: &str) -> Option<&'static str> {
        match name {
            "student_id" if !validate_student_id(value) => Some(STUDENT_ID_MESSAGE),
            "name" if !validate_name(value) => Some(NAME_MESSAGE),
            "email" if !validate_email(value) => Some(EMAIL_MESSAGE),
            "password" | "new_password" if !validate_password(value) => Some(PASSWORD_MESSAGE),
            _ => None,
        }
    }
}
