//! Saving an edited form: the submitted transaction list is reconciled against the stored rows
//! so that a single save inserts, updates and deletes transactions and attaches new receipts.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::FormId,
    form::{
        core::{FormGraph, update_form_fields},
        read::get_form_graph,
        submission::{FormUpdate, TransactionKey},
    },
    receipt::{delete_receipts_for_transaction, insert_receipt},
    transaction::{
        delete_transaction, get_transaction_form_id, insert_transaction, update_transaction,
    },
};

/// Apply `update` to the form `form_id` and return the saved form graph.
///
/// All writes happen in one SQLite transaction, in this order:
/// 1. the form's editable fields are overwritten and its update time is stamped;
/// 2. every transaction in `deleted_transaction_ids` that belongs to the form is deleted after
///    its receipts;
/// 3. each submitted transaction is either updated in place ([TransactionKey::Existing]) or
///    inserted ([TransactionKey::New]), then its new files are stored as receipts.
///
/// Deleted IDs that do not belong to the form are skipped.
///
/// # Errors
/// - [Error::FormNotFound] if there is no form `form_id`.
/// - [Error::TransactionNotFound] if an existing transaction is missing or belongs to another
///   form.
/// - [Error::SqlError] if a query fails.
///
/// Nothing is written when an error is returned.
pub fn update_form_with_files(
    form_id: FormId,
    update: &FormUpdate,
    connection: &Connection,
) -> Result<FormGraph, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    if update_form_fields(form_id, &update.fields, &sql_transaction)? == 0 {
        return Err(Error::FormNotFound(form_id));
    }

    for &transaction_id in &update.deleted_transaction_ids {
        if get_transaction_form_id(transaction_id, &sql_transaction)? != Some(form_id) {
            tracing::warn!(
                "Skipping deletion of transaction {transaction_id}, it does not belong to form {form_id}"
            );
            continue;
        }

        delete_receipts_for_transaction(transaction_id, &sql_transaction)?;
        delete_transaction(transaction_id, &sql_transaction)?;
    }

    for submitted in &update.transactions {
        let transaction_id = match submitted.key {
            TransactionKey::Existing(transaction_id) => {
                if get_transaction_form_id(transaction_id, &sql_transaction)? != Some(form_id) {
                    return Err(Error::TransactionNotFound(transaction_id));
                }

                update_transaction(transaction_id, &submitted.fields, &sql_transaction)?;
                transaction_id
            }
            TransactionKey::New => {
                insert_transaction(form_id, &submitted.fields, &sql_transaction)?
            }
        };

        for file in &submitted.new_files {
            insert_receipt(transaction_id, file, &sql_transaction)?;
        }
    }

    sql_transaction.commit()?;

    get_form_graph(form_id, false, connection)?.ok_or(Error::FormNotFound(form_id))
}
