//! The read path for forms: listing forms and fetching a form with its transactions and
//! receipts.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::{
    Error,
    database_id::{FormId, TransactionId},
    form::core::{FORM_COLUMNS, Form, FormGraph, TransactionWithReceipts, get_form, map_row_to_form},
    receipt::{Receipt, get_receipts_for_transactions},
    transaction::get_transactions_for_form,
};

/// Fetch the form `form_id` with its transactions and their receipts.
///
/// With `skip_receipts` set, every transaction gets an empty receipt list and the receipt table
/// is not queried. This keeps the first paint of a form cheap, since receipt content can be
/// large.
///
/// Returns `Ok(None)` if there is no such form.
pub fn get_form_graph(
    form_id: FormId,
    skip_receipts: bool,
    connection: &Connection,
) -> Result<Option<FormGraph>, Error> {
    let Some(form) = get_form(form_id, connection)? else {
        return Ok(None);
    };

    let transactions = get_transactions_for_form(form_id, connection)?;

    let mut receipts_by_transaction: HashMap<TransactionId, Vec<Receipt>> = HashMap::new();
    if !skip_receipts {
        let transaction_ids: Vec<TransactionId> =
            transactions.iter().map(|transaction| transaction.id).collect();

        for receipt in get_receipts_for_transactions(&transaction_ids, connection)? {
            receipts_by_transaction
                .entry(receipt.transaction_id)
                .or_default()
                .push(receipt);
        }
    }

    let transactions = transactions
        .into_iter()
        .map(|transaction| TransactionWithReceipts {
            receipts: receipts_by_transaction
                .remove(&transaction.id)
                .unwrap_or_default(),
            transaction,
        })
        .collect();

    Ok(Some(FormGraph { form, transactions }))
}

/// List forms, newest first, optionally only those submitted by the user `owner`.
pub fn list_forms(owner: Option<&str>, connection: &Connection) -> Result<Vec<Form>, Error> {
    let forms = match owner {
        Some(user_id) => connection
            .prepare(&format!(
                "SELECT {FORM_COLUMNS} FROM form WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
            ))?
            .query_map([user_id], map_row_to_form)?
            .collect::<Result<Vec<_>, _>>()?,
        None => connection
            .prepare(&format!(
                "SELECT {FORM_COLUMNS} FROM form ORDER BY created_at DESC, id DESC"
            ))?
            .query_map([], map_row_to_form)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(forms)
}
