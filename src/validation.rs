//! Field-attributed validation errors for request payloads.

use std::fmt::Display;

use serde::Serialize;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::Error;

/// A validation failure for a single field.
///
/// `field` is the path of the field in the request payload, e.g.
/// `transactions[0].newFiles[0].base64Content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// The path of the invalid field.
    pub field: String,
    /// What is wrong with the field, in words a user can act on.
    pub message: String,
}

impl FieldError {
    /// Create an error for the field at the path `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join field errors into a single line for logs and alerts.
pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Run the validators of `payload`, converting any failures into [Error::Validation].
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), Error> {
    payload
        .validate()
        .map_err(|errors| Error::Validation(flatten_validation_errors(&errors)))
}

/// Flatten nested validator errors into a list of [FieldError] sorted by field path.
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut field_errors = Vec::new();
    collect_field_errors("", errors, &mut field_errors);
    field_errors.sort_by(|left, right| left.field.cmp(&right.field));

    field_errors
}

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = to_payload_field_name(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errors) => {
                for error in errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| error.code.to_string());

                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(errors) => collect_field_errors(&path, errors, out),
            ValidationErrorsKind::List(items) => {
                for (index, errors) in items {
                    collect_field_errors(&format!("{path}[{index}]"), errors, out);
                }
            }
        }
    }
}

/// Fields whose payload key is not the camel case form of the struct field.
const RENAMED_FIELDS: &[(&str, &str)] = &[("file_type", "type")];

/// The key that `field` is sent under in a request payload.
fn to_payload_field_name(field: &str) -> String {
    RENAMED_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, renamed)| (*renamed).to_owned())
        .unwrap_or_else(|| to_camel_case(field))
}

/// Payload field names are camel case, e.g. `place_vendor` is sent as `placeVendor`.
fn to_camel_case(field: &str) -> String {
    let mut camel_case = String::with_capacity(field.len());
    let mut upper_next = false;

    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            camel_case.extend(c.to_uppercase());
            upper_next = false;
        } else {
            camel_case.push(c);
        }
    }

    camel_case
}
