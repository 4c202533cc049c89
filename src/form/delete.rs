//! Deleting a form together with its transactions and receipts.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::FormId,
    receipt::delete_receipts_for_transaction,
    transaction::{delete_transaction, get_transactions_for_form},
};

/// Delete the form `form_id`, its transactions and their receipts in one SQLite transaction.
///
/// The schema has no cascading deletes, so children are removed before their parents.
///
/// # Errors
/// Returns [Error::FormNotFound] if there is no such form.
pub fn delete_form(form_id: FormId, connection: &Connection) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    for transaction in get_transactions_for_form(form_id, &sql_transaction)? {
        delete_receipts_for_transaction(transaction.id, &sql_transaction)?;
        delete_transaction(transaction.id, &sql_transaction)?;
    }

    let rows_affected =
        sql_transaction.execute("DELETE FROM form WHERE id = :id", &[(":id", &form_id)])?;

    if rows_affected == 0 {
        return Err(Error::FormNotFound(form_id));
    }

    sql_transaction.commit()?;

    Ok(())
}
