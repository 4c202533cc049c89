//! Code for creating the user table and recording the users that submit forms.

use rusqlite::Connection;

use crate::{Error, auth::Identity};

/// A user that has submitted at least one form.
///
/// Users are owned by the identity provider. The row is kept up to date with the identity seen
/// on each submission.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The identity provider's ID for the user.
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            name TEXT
        )",
        (),
    )?;

    Ok(())
}

#[cfg(test)]
fn map_row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
    })
}

/// Insert the user described by `identity`, or refresh their email and name if they exist.
pub fn upsert_user(identity: &Identity, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO user (id, email, name) VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
        (&identity.user_id, &identity.email, &identity.name),
    )?;

    Ok(())
}

/// Get a user by their identity provider ID.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such user.
#[cfg(test)]
pub fn get_user(id: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            "SELECT id, email, name FROM user WHERE id = ?1",
            [id],
            map_row_to_user,
        )
        .map_err(Error::from)
}
