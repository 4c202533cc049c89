//! Defines the core data models and database queries for transactions, the line-item expenses
//! of a form.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{FormId, TransactionId},
    storage_date::{self, format_storage_date},
};

// ============================================================================
// MODELS
// ============================================================================

/// A string did not name one of the allowed choices.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not an allowed value")]
pub struct UnknownChoice(pub String);

/// The account line an expense is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountLine {
    #[serde(rename = "General Fund")]
    GeneralFund,
    #[serde(rename = "Missions")]
    Missions,
    #[serde(rename = "Church Plant")]
    ChurchPlant,
}

impl AccountLine {
    /// Every account line, in display order.
    pub const ALL: [AccountLine; 3] = [
        AccountLine::GeneralFund,
        AccountLine::Missions,
        AccountLine::ChurchPlant,
    ];

    /// The name of the account line as shown to users and stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountLine::GeneralFund => "General Fund",
            AccountLine::Missions => "Missions",
            AccountLine::ChurchPlant => "Church Plant",
        }
    }
}

impl Display for AccountLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountLine {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountLine::ALL
            .into_iter()
            .find(|line| line.as_str() == s)
            .ok_or_else(|| UnknownChoice(s.to_owned()))
    }
}

/// The church department that incurred an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    Worship,
    Youth,
    Children,
    Admin,
}

impl Department {
    /// Every department, in display order.
    pub const ALL: [Department; 4] = [
        Department::Worship,
        Department::Youth,
        Department::Children,
        Department::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Worship => "Worship",
            Department::Youth => "Youth",
            Department::Children => "Children",
            Department::Admin => "Admin",
        }
    }
}

impl Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Department::ALL
            .into_iter()
            .find(|department| department.as_str() == s)
            .ok_or_else(|| UnknownChoice(s.to_owned()))
    }
}

impl ToSql for AccountLine {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountLine {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for Department {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Department {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The user editable fields of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFields {
    /// The calendar day of the expense.
    pub date: Date,
    pub account_line: AccountLine,
    pub department: Department,
    /// Where the money was spent.
    pub place_vendor: String,
    /// What the money was spent on.
    pub description: String,
    /// The amount spent in dollars.
    pub amount: f64,
}

/// A stored expense belonging to a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    #[serde(rename = "transactionId")]
    pub id: TransactionId,
    /// The form the transaction belongs to.
    pub form_id: FormId,
    #[serde(with = "storage_date::as_storage_date")]
    pub date: Date,
    pub account_line: AccountLine,
    pub department: Department,
    pub place_vendor: String,
    pub description: String,
    pub amount: f64,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns selected by [map_row_to_transaction], in order.
pub const TRANSACTION_COLUMNS: &str =
    "id, form_id, date, account_line, department, place_vendor, description, amount";

pub type RowsAffected = usize;

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            form_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            account_line TEXT NOT NULL,
            department TEXT NOT NULL,
            place_vendor TEXT NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            FOREIGN KEY(form_id) REFERENCES form(id)
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_form_id ON \"transaction\"(form_id)",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let date_text: String = row.get(2)?;
    let date = storage_date::from_storage_date_string(&date_text)
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error))
        })?
        .date();

    Ok(Transaction {
        id: row.get(0)?,
        form_id: row.get(1)?,
        date,
        account_line: row.get(3)?,
        department: row.get(4)?,
        place_vendor: row.get(5)?,
        description: row.get(6)?,
        amount: row.get(7)?,
    })
}

/// Insert a transaction for the form `form_id` and return its generated ID.
///
/// # Errors
/// Returns [Error::SqlError] if the form does not exist or the query fails.
pub fn insert_transaction(
    form_id: FormId,
    fields: &TransactionFields,
    connection: &Connection,
) -> Result<TransactionId, Error> {
    connection.execute(
        "INSERT INTO \"transaction\"
            (form_id, date, account_line, department, place_vendor, description, amount)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            form_id,
            format_storage_date(fields.date),
            fields.account_line,
            fields.department,
            &fields.place_vendor,
            &fields.description,
            fields.amount,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Overwrite the editable fields of the transaction `id`.
pub fn update_transaction(
    id: TransactionId,
    fields: &TransactionFields,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "UPDATE \"transaction\"
            SET date = ?1, account_line = ?2, department = ?3, place_vendor = ?4,
                description = ?5, amount = ?6
            WHERE id = ?7",
            (
                format_storage_date(fields.date),
                fields.account_line,
                fields.department,
                &fields.place_vendor,
                &fields.description,
                fields.amount,
                id,
            ),
        )
        .map_err(Error::from)
}

/// Get the ID of the form that owns the transaction `id`, or `None` if there is no such
/// transaction.
pub fn get_transaction_form_id(
    id: TransactionId,
    connection: &Connection,
) -> Result<Option<FormId>, Error> {
    match connection.query_row(
        "SELECT form_id FROM \"transaction\" WHERE id = ?1",
        [id],
        |row| row.get(0),
    ) {
        Ok(form_id) => Ok(Some(form_id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Get the transactions of a form, oldest first.
pub fn get_transactions_for_form(
    form_id: FormId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE form_id = ?1 ORDER BY id ASC"
        ))?
        .query_map([form_id], map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Delete the transaction `id`. The caller must delete its receipts first.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])
        .map_err(Error::from)
}
