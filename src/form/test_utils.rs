//! Helpers for inserting forms and transactions in tests.

use rusqlite::Connection;
use time::{OffsetDateTime, macros::date};

use crate::{
    auth::Identity,
    database_id::{FormId, TransactionId},
    transaction::{AccountLine, Department, TransactionFields, insert_transaction},
    user::upsert_user,
};

pub(crate) fn test_identity() -> Identity {
    Identity {
        user_id: "user_test".to_owned(),
        email: "pat@example.com".to_owned(),
        name: Some("Pat Submitter".to_owned()),
    }
}

pub(crate) fn test_transaction_fields() -> TransactionFields {
    TransactionFields {
        date: date!(2025 - 02 - 01),
        account_line: AccountLine::Missions,
        department: Department::Worship,
        place_vendor: "Guitar Center".to_owned(),
        description: "Replacement strings".to_owned(),
        amount: 19.99,
    }
}

/// Insert a form owned by [test_identity] with no transactions.
#[track_caller]
pub(crate) fn insert_test_form(connection: &Connection) -> FormId {
    let identity = test_identity();
    upsert_user(&identity, connection).expect("could not insert test user");
    let now = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO form (user_id, form_type, submitter_name, submitter_email,
                reimbursed_name, reimbursed_email, created_at, updated_at)
            VALUES (?1, 'REIMBURSEMENT', ?2, ?3, 'Alex Doe', 'alex@example.com', ?4, ?4)",
            (
                &identity.user_id,
                identity.name.as_deref().unwrap_or_default(),
                &identity.email,
                now,
            ),
        )
        .expect("could not insert test form");

    connection.last_insert_rowid()
}

#[track_caller]
pub(crate) fn insert_test_transaction(form_id: FormId, connection: &Connection) -> TransactionId {
    insert_transaction(form_id, &test_transaction_fields(), connection)
        .expect("could not insert test transaction")
}
