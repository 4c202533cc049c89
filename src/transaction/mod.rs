//! Transactions: the expense line items of a form.

mod core;

pub use core::{
    AccountLine, Department, RowsAffected, Transaction, TransactionFields,
    create_transaction_table, delete_transaction, get_transaction_form_id,
    get_transactions_for_form, insert_transaction, update_transaction,
};
