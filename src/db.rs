//! Creates the application's SQLite schema.

use rusqlite::Connection;

use crate::{
    Error, form::create_form_table, receipt::create_receipt_table,
    transaction::create_transaction_table, user::create_user_table,
};

/// Enable foreign key checks and create the tables for the domain models.
///
/// Tables are created in dependency order inside a single transaction. Calling this on an
/// initialized database is a no-op.
///
/// # Errors
/// Returns an error if any of the SQL statements fail.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // The pragma is a no-op inside a transaction, so it must be set first.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_form_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_receipt_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
