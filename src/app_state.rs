//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, db::initialize, page_cache::PageCache};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The secret the identity provider signs session tokens with.
    pub auth_secret: String,

    /// Where to send users that are not signed in.
    pub sign_in_url: String,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// Rendered pages that are served until a write marks them stale.
    pub page_cache: PageCache,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        auth_secret: &str,
        sign_in_url: &str,
        local_timezone: &str,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            auth_secret: auth_secret.to_owned(),
            sign_in_url: sign_in_url.to_owned(),
            local_timezone: local_timezone.to_owned(),
            page_cache: PageCache::new(),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}
