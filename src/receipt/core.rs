//! Defines receipts, the files attached to a transaction, and the queries that store them.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rusqlite::{Connection, Row, params_from_iter};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{ReceiptId, TransactionId},
    transaction::RowsAffected,
};

/// The most receipts a transaction may have.
pub const MAX_RECEIPTS_PER_TRANSACTION: usize = 2;

/// How many transaction IDs go into each `IN (...)` clause when fetching receipts.
pub const RECEIPT_BATCH_SIZE: usize = 10;

/// A file uploaded for a transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFile {
    /// The original file name.
    pub name: String,
    /// The MIME type, e.g. "image/png".
    pub file_type: String,
    /// A base64 data URL or raw base64 text.
    pub base64_content: String,
}

/// A stored receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: ReceiptId,
    pub transaction_id: TransactionId,
    pub name: String,
    pub file_type: String,
    pub base64_content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Returns the base64 payload of `content`, dropping a `data:<type>;base64,` prefix if there is
/// one.
pub fn strip_data_url_prefix(content: &str) -> &str {
    if content.starts_with("data:")
        && let Some((_, payload)) = content.split_once(',')
    {
        return payload;
    }

    content
}

/// Encode `bytes` as a base64 data URL with the MIME type `file_type`.
pub fn to_data_url(file_type: &str, bytes: &[u8]) -> String {
    format!("data:{file_type};base64,{}", BASE64.encode(bytes))
}

/// Decode the stored content of a receipt into the original file bytes.
pub fn decode_receipt_content(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload: String = strip_data_url_prefix(content)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    BASE64.decode(payload)
}

pub const RECEIPT_COLUMNS: &str =
    "id, transaction_id, name, file_type, base64_content, created_at, updated_at";

pub fn create_receipt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS receipt (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            base64_content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id)
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_receipt_transaction_id ON receipt(transaction_id)",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_receipt(row: &Row) -> Result<Receipt, rusqlite::Error> {
    Ok(Receipt {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        name: row.get(2)?,
        file_type: row.get(3)?,
        base64_content: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Attach `file` to the transaction `transaction_id` and return the new receipt's ID.
pub fn insert_receipt(
    transaction_id: TransactionId,
    file: &ReceiptFile,
    connection: &Connection,
) -> Result<ReceiptId, Error> {
    let now = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO receipt
            (transaction_id, name, file_type, base64_content, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        (
            transaction_id,
            &file.name,
            &file.file_type,
            &file.base64_content,
            now,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Get the receipts of all the given transactions, ordered by transaction then receipt ID.
///
/// The IDs are queried in batches of [RECEIPT_BATCH_SIZE].
pub fn get_receipts_for_transactions(
    transaction_ids: &[TransactionId],
    connection: &Connection,
) -> Result<Vec<Receipt>, Error> {
    let mut receipts = Vec::new();

    for batch in transaction_ids.chunks(RECEIPT_BATCH_SIZE) {
        let placeholders = vec!["?"; batch.len()].join(", ");
        let query = format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipt WHERE transaction_id IN ({placeholders}) \
            ORDER BY transaction_id ASC, id ASC"
        );

        let mut statement = connection.prepare(&query)?;
        for receipt in statement.query_map(params_from_iter(batch.iter()), map_row_to_receipt)? {
            receipts.push(receipt?);
        }
    }

    Ok(receipts)
}

/// Get a single receipt, or `None` if it does not exist.
pub fn get_receipt(id: ReceiptId, connection: &Connection) -> Result<Option<Receipt>, Error> {
    match connection.query_row(
        &format!("SELECT {RECEIPT_COLUMNS} FROM receipt WHERE id = ?1"),
        [id],
        map_row_to_receipt,
    ) {
        Ok(receipt) => Ok(Some(receipt)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Count the receipts stored for a transaction.
pub fn count_receipts_for_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<usize, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM receipt WHERE transaction_id = ?1",
        [transaction_id],
        |row| row.get(0),
    )?;

    usize::try_from(count)
        .map_err(|_| Error::SqlError(rusqlite::Error::IntegralValueOutOfRange(0, count)))
}

pub fn delete_receipts_for_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM receipt WHERE transaction_id = ?1",
            [transaction_id],
        )
        .map_err(Error::from)
}
