//! Defines forms, the top-level reimbursement requests, and the form graph returned by the read
//! path.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::FormId,
    receipt::Receipt,
    transaction::{RowsAffected, Transaction},
};

/// The form type used when a client does not ask for one.
pub const DEFAULT_FORM_TYPE: &str = "REIMBURSEMENT";

/// A stored reimbursement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: FormId,
    /// The identity provider's ID for the user that submitted the form.
    pub user_id: String,
    /// The kind of form, e.g. "REIMBURSEMENT".
    pub form_type: String,
    pub submitter_name: String,
    pub submitter_email: String,
    /// Who should be paid back.
    pub reimbursed_name: String,
    pub reimbursed_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The fields of a form that may change after it is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFields {
    pub form_type: String,
    pub reimbursed_name: String,
    pub reimbursed_email: String,
}

/// A transaction together with its receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionWithReceipts {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub receipts: Vec<Receipt>,
}

/// A form with its transactions and their receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormGraph {
    pub form: Form,
    pub transactions: Vec<TransactionWithReceipts>,
}

impl FormGraph {
    /// The sum of the amounts of every transaction in the form.
    pub fn total_amount(&self) -> f64 {
        self.transactions
            .iter()
            .map(|entry| entry.transaction.amount)
            .sum()
    }
}

pub const FORM_COLUMNS: &str = "id, user_id, form_type, submitter_name, submitter_email, \
    reimbursed_name, reimbursed_email, created_at, updated_at";

pub fn create_form_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS form (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            form_type TEXT NOT NULL,
            submitter_name TEXT NOT NULL,
            submitter_email TEXT NOT NULL,
            reimbursed_name TEXT NOT NULL,
            reimbursed_email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id)
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_form(row: &Row) -> Result<Form, rusqlite::Error> {
    Ok(Form {
        id: row.get(0)?,
        user_id: row.get(1)?,
        form_type: row.get(2)?,
        submitter_name: row.get(3)?,
        submitter_email: row.get(4)?,
        reimbursed_name: row.get(5)?,
        reimbursed_email: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Get the form `id`, or `None` if it does not exist.
pub fn get_form(id: FormId, connection: &Connection) -> Result<Option<Form>, Error> {
    match connection.query_row(
        &format!("SELECT {FORM_COLUMNS} FROM form WHERE id = ?1"),
        [id],
        map_row_to_form,
    ) {
        Ok(form) => Ok(Some(form)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Overwrite the editable fields of the form `id` and stamp its update time.
pub fn update_form_fields(
    id: FormId,
    fields: &FormFields,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE form
            SET form_type = ?1, reimbursed_name = ?2, reimbursed_email = ?3, updated_at = ?4
            WHERE id = ?5",
            (
                &fields.form_type,
                &fields.reimbursed_name,
                &fields.reimbursed_email,
                OffsetDateTime::now_utc(),
                id,
            ),
        )
        .map_err(Error::from)
}

/// The file name to use when a form is downloaded as a PDF, e.g. "reimbursement-12.pdf".
///
/// The result only contains `[a-z0-9-]` and the extension, so it can be quoted in a
/// `Content-Disposition` header as is.
pub fn pdf_file_name(form: &Form) -> String {
    let form_type: String = form
        .form_type
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let form_type = form_type.trim_matches('-');

    if form_type.is_empty() {
        format!("form-{}.pdf", form.id)
    } else {
        format!("{form_type}-{}.pdf", form.id)
    }
}
