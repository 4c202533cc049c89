//! Request payloads for creating and updating forms, and their conversion into validated domain
//! values.
//!
//! Payloads are validated with `validator` before any conversion takes place so that every
//! failure can be reported against the field that caused it.

use std::borrow::Cow;

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::{
    Error,
    database_id::{FormId, TransactionId},
    form::core::{DEFAULT_FORM_TYPE, FormFields},
    receipt::{ReceiptFile, strip_data_url_prefix},
    storage_date::parse_client_date,
    transaction::{AccountLine, Department, TransactionFields},
    validation::{FieldError, validate_payload},
};

/// The shortest base64 payload accepted for a receipt file.
pub const MIN_BASE64_CONTENT_LENGTH: usize = 16;

/// Whether a submitted transaction refers to a stored row or should be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKey {
    New,
    Existing(TransactionId),
}

impl TransactionKey {
    /// Clients mark rows that have not been saved yet with a missing, zero or negative ID.
    pub fn from_client_id(id: Option<TransactionId>) -> Self {
        match id {
            Some(id) if id > 0 => TransactionKey::Existing(id),
            _ => TransactionKey::New,
        }
    }
}

/// A validated transaction from a form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTransaction {
    pub key: TransactionKey,
    pub fields: TransactionFields,
    /// Files to attach to the transaction.
    pub new_files: Vec<ReceiptFile>,
}

/// A validated new form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub fields: FormFields,
    pub transactions: Vec<SubmittedTransaction>,
}

/// A validated edit of an existing form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormUpdate {
    pub fields: FormFields,
    pub transactions: Vec<SubmittedTransaction>,
    /// Stored transactions to remove along with their receipts.
    pub deleted_transaction_ids: Vec<TransactionId>,
}

fn default_form_type() -> String {
    DEFAULT_FORM_TYPE.to_owned()
}

/// A file attached to a transaction.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptFileRequest {
    #[validate(length(min = 1, message = "File name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "File type is required"))]
    pub file_type: String,
    #[validate(custom(function = "validate_base64_content"))]
    pub base64_content: String,
}

/// A transaction as sent by a client.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// The stored ID, or a missing/non-positive ID for a new transaction.
    #[serde(default)]
    pub id: Option<TransactionId>,
    /// A `YYYY-MM-DD` date or an RFC 3339 timestamp.
    #[validate(custom(function = "validate_client_date"))]
    pub date: String,
    #[validate(custom(function = "validate_account_line"))]
    pub account_line: String,
    #[validate(custom(function = "validate_department"))]
    pub department: String,
    #[validate(length(min = 1, message = "Place/Vendor is required"))]
    pub place_vendor: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    /// A JSON number or a numeric string.
    #[serde(deserialize_with = "deserialize_amount")]
    #[validate(
        custom(function = "validate_finite_amount"),
        range(min = 0.01, message = "Amount must be at least $0.01")
    )]
    pub amount: f64,
    #[serde(default)]
    #[validate(nested)]
    pub new_files: Vec<ReceiptFileRequest>,
}

/// The editable fields of a form as sent by a client.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldsRequest {
    #[serde(default = "default_form_type")]
    #[validate(length(min = 1, message = "Form type is required"))]
    pub form_type: String,
    #[validate(length(min = 1, message = "Reimbursed name is required"))]
    pub reimbursed_name: String,
    #[validate(email(message = "Invalid email"))]
    pub reimbursed_email: String,
}

/// The payload for creating a form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewFormRequest {
    #[validate(nested)]
    pub form_fields: FormFieldsRequest,
    #[validate(nested)]
    pub transactions: Vec<TransactionRequest>,
}

/// The payload for updating a form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    /// Optional, but must match the form being edited when present.
    #[serde(default)]
    pub form_id: Option<FormId>,
    #[validate(nested)]
    pub form_fields: FormFieldsRequest,
    #[validate(nested)]
    pub transactions: Vec<TransactionRequest>,
    #[serde(default)]
    pub deleted_transaction_ids: Vec<TransactionId>,
}

fn choice_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_client_date(date: &str) -> Result<(), ValidationError> {
    parse_client_date(date)
        .map(|_| ())
        .map_err(|_| choice_error("date", "Date must be a valid date"))
}

fn validate_account_line(account_line: &str) -> Result<(), ValidationError> {
    account_line
        .parse::<AccountLine>()
        .map(|_| ())
        .map_err(|_| {
            choice_error(
                "account_line",
                "Account line must be one of General Fund, Missions or Church Plant",
            )
        })
}

fn validate_department(department: &str) -> Result<(), ValidationError> {
    department
        .parse::<Department>()
        .map(|_| ())
        .map_err(|_| {
            choice_error(
                "department",
                "Department must be one of Worship, Youth, Children or Admin",
            )
        })
}

fn validate_finite_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(choice_error("amount", "Amount must be a number"))
    }
}

/// Read an amount sent either as a number or as text, e.g. `"42.50"`.
///
/// Text that is not a number becomes NaN so that [validate_finite_amount] reports it against
/// the amount field.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    Ok(match Amount::deserialize(deserializer)? {
        Amount::Number(amount) => amount,
        Amount::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
    })
}

fn validate_base64_content(content: &str) -> Result<(), ValidationError> {
    let payload = strip_data_url_prefix(content).trim();

    if payload.is_empty() {
        Err(choice_error("base64_content", "File content is missing"))
    } else if payload.len() < MIN_BASE64_CONTENT_LENGTH {
        Err(choice_error("base64_content", "File content is too short"))
    } else {
        Ok(())
    }
}

impl ReceiptFileRequest {
    fn into_receipt_file(self) -> ReceiptFile {
        ReceiptFile {
            name: self.name,
            file_type: self.file_type,
            base64_content: self.base64_content,
        }
    }
}

impl TransactionRequest {
    /// Convert an already validated request into a [SubmittedTransaction].
    fn into_submitted(self, index: usize) -> Result<SubmittedTransaction, Error> {
        let invalid = |field: &str, message: &str| {
            Error::Validation(vec![FieldError::new(
                format!("transactions[{index}].{field}"),
                message,
            )])
        };

        let date = parse_client_date(&self.date)
            .map_err(|_| invalid("date", "Date must be a valid date"))?;
        let account_line = self
            .account_line
            .parse()
            .map_err(|_| invalid("accountLine", "Unknown account line"))?;
        let department = self
            .department
            .parse()
            .map_err(|_| invalid("department", "Unknown department"))?;

        Ok(SubmittedTransaction {
            key: TransactionKey::from_client_id(self.id),
            fields: TransactionFields {
                date,
                account_line,
                department,
                place_vendor: self.place_vendor,
                description: self.description,
                amount: self.amount,
            },
            new_files: self
                .new_files
                .into_iter()
                .map(ReceiptFileRequest::into_receipt_file)
                .collect(),
        })
    }
}

impl FormFieldsRequest {
    fn into_form_fields(self) -> FormFields {
        FormFields {
            form_type: self.form_type,
            reimbursed_name: self.reimbursed_name,
            reimbursed_email: self.reimbursed_email,
        }
    }
}

fn into_submitted_transactions(
    transactions: Vec<TransactionRequest>,
) -> Result<Vec<SubmittedTransaction>, Error> {
    transactions
        .into_iter()
        .enumerate()
        .map(|(index, transaction)| transaction.into_submitted(index))
        .collect()
}

impl NewFormRequest {
    /// Validate the request and convert it into a [FormSubmission].
    ///
    /// # Errors
    /// Returns [Error::Validation] listing every invalid field, including an error for
    /// `transactions` if there are none.
    pub fn into_submission(self) -> Result<FormSubmission, Error> {
        let mut field_errors = match validate_payload(&self) {
            Ok(()) => Vec::new(),
            Err(Error::Validation(errors)) => errors,
            Err(error) => return Err(error),
        };

        if self.transactions.is_empty() {
            field_errors.push(FieldError::new(
                "transactions",
                "At least one transaction is required",
            ));
        }

        if !field_errors.is_empty() {
            return Err(Error::Validation(field_errors));
        }

        Ok(FormSubmission {
            fields: self.form_fields.into_form_fields(),
            transactions: into_submitted_transactions(self.transactions)?,
        })
    }
}

impl UpdateFormRequest {
    /// Validate the request for the form `form_id` and convert it into a [FormUpdate].
    ///
    /// # Errors
    /// Returns [Error::Validation] listing every invalid field.
    pub fn into_update(self, form_id: FormId) -> Result<FormUpdate, Error> {
        let mut field_errors = match validate_payload(&self) {
            Ok(()) => Vec::new(),
            Err(Error::Validation(errors)) => errors,
            Err(error) => return Err(error),
        };

        if let Some(body_form_id) = self.form_id
            && body_form_id != form_id
        {
            field_errors.push(FieldError::new(
                "formId",
                format!("Form ID {body_form_id} does not match the form being edited"),
            ));
        }

        if !field_errors.is_empty() {
            return Err(Error::Validation(field_errors));
        }

        Ok(FormUpdate {
            fields: self.form_fields.into_form_fields(),
            transactions: into_submitted_transactions(self.transactions)?,
            deleted_transaction_ids: self.deleted_transaction_ids,
        })
    }
}
