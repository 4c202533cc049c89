//! Receipts: the image and PDF files attached to a transaction.

mod core;
mod delete;

pub use core::{
    MAX_RECEIPTS_PER_TRANSACTION, RECEIPT_BATCH_SIZE, Receipt, ReceiptFile,
    count_receipts_for_transaction, create_receipt_table, decode_receipt_content,
    delete_receipts_for_transaction, get_receipt, get_receipts_for_transactions, insert_receipt,
    strip_data_url_prefix, to_data_url,
};
pub use delete::{delete_receipt_api, delete_receipt_endpoint};
