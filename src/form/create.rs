//! Creating a new form with its transactions and receipts.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::Identity,
    database_id::FormId,
    form::submission::FormSubmission,
    receipt::insert_receipt,
    transaction::insert_transaction,
    user::upsert_user,
    validation::FieldError,
};

/// Store `submission` as a new form submitted by `identity` and return the form's ID.
///
/// The submitter's name and email are copied from `identity`. The user row, the form, its
/// transactions and their receipts are written in one SQLite transaction.
///
/// # Errors
/// Returns [Error::Validation] if the submission has no transactions, or [Error::SqlError] if a
/// query fails. Nothing is written when an error is returned.
pub fn create_form(
    submission: &FormSubmission,
    identity: &Identity,
    connection: &Connection,
) -> Result<FormId, Error> {
    if submission.transactions.is_empty() {
        return Err(Error::Validation(vec![FieldError::new(
            "transactions",
            "At least one transaction is required",
        )]));
    }

    let sql_transaction = connection.unchecked_transaction()?;

    upsert_user(identity, &sql_transaction)?;

    let now = OffsetDateTime::now_utc();
    sql_transaction.execute(
        "INSERT INTO form (user_id, form_type, submitter_name, submitter_email,
            reimbursed_name, reimbursed_email, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        (
            &identity.user_id,
            &submission.fields.form_type,
            identity.display_name(),
            &identity.email,
            &submission.fields.reimbursed_name,
            &submission.fields.reimbursed_email,
            now,
        ),
    )?;
    let form_id = sql_transaction.last_insert_rowid();

    for submitted in &submission.transactions {
        let transaction_id = insert_transaction(form_id, &submitted.fields, &sql_transaction)?;

        for file in &submitted.new_files {
            insert_receipt(transaction_id, file, &sql_transaction)?;
        }
    }

    sql_transaction.commit()?;

    Ok(form_id)
}
