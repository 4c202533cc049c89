//! HighRidge Forms is a web app for submitting and reviewing reimbursement forms.
//!
//! A form collects one or more expense transactions, each with up to two receipt files.
//! This library serves the HTML pages, a JSON API and PDF exports of forms.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::{Value, json};
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod config;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod error_page;
mod form;
mod html;
mod logging;
mod navigation;
mod page_cache;
mod pdf;
mod receipt;
mod routing;
mod storage_date;
mod timezone;
mod transaction;
mod user;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{Claims, Identity, SESSION_COOKIE, encode_session_token};
pub use config::Config;
pub use routing::build_router;
pub use validation::FieldError;

use crate::{
    alert::Alert,
    database_id::{FormId, ReceiptId, TransactionId},
    error_page::{get_404_not_found_response, get_500_internal_server_error_response},
    validation::join_field_errors,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more fields of a request failed validation.
    ///
    /// Nothing is written when this error is returned.
    #[error("{}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The form does not exist.
    #[error("Form with ID {0} not found.")]
    FormNotFound(FormId),

    /// The transaction does not exist, or does not belong to the form being edited.
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// The receipt does not exist.
    #[error("Receipt {0} not found")]
    ReceiptNotFound(ReceiptId),

    /// The caller tried to change a resource that belongs to another form.
    #[error("Unauthorized access")]
    Unauthorized,

    /// The request did not carry a valid session token.
    #[error("a valid session token is required")]
    Unauthenticated,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The PDF export of a form could not be built.
    #[error("could not generate the PDF: {0}")]
    PdfError(String),

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound | Error::FormNotFound(_) => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => {
                get_500_internal_server_error_response(Some(&format!(
                    "Could not get local timezone \"{timezone}\". Set LOCAL_TIMEZONE to a valid, \
                    canonical timezone name such as \"Pacific/Auckland\""
                )))
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                get_500_internal_server_error_response(None)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::MultipartError(_) => StatusCode::BAD_REQUEST,
            Error::NotFound
            | Error::FormNotFound(_)
            | Error::TransactionNotFound(_)
            | Error::ReceiptNotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::FORBIDDEN,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::PdfError(_)
            | Error::InvalidTimezoneError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render the error as an alert fragment for HTMX requests.
    ///
    /// The alert shows the error text as is so that the user sees exactly what failed. The page
    /// the request came from is left untouched.
    fn into_alert_response(self) -> Response {
        let status_code = self.status_code();
        let title = match &self {
            Error::Validation(_) => "Please fix the highlighted fields",
            Error::NotFound
            | Error::FormNotFound(_)
            | Error::TransactionNotFound(_)
            | Error::ReceiptNotFound(_) => "Not found",
            Error::Unauthorized => "Not allowed",
            Error::Unauthenticated => "Please sign in again",
            Error::MultipartError(_) => "Could not read the uploaded files",
            _ => "Something went wrong",
        };

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (
            status_code,
            Alert::Error {
                message: title.to_owned(),
                details: self.to_string(),
            },
        )
            .into_response()
    }

    /// Render the error as the JSON API's error envelope: `{success: false, error, details?}`.
    fn into_json_response(self) -> Response {
        let status_code = self.status_code();
        let details: Option<Value> = match &self {
            Error::Validation(errors) => Some(json!(errors)),
            Error::SqlError(rusqlite::Error::SqliteFailure(sql_error, message)) => Some(json!({
                "code": sql_error.extended_code,
                "message": message.clone().unwrap_or_else(|| sql_error.to_string()),
            })),
            Error::SqlError(error) => Some(json!({ "message": error.to_string() })),
            _ => None,
        };

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });

        if let (Some(details), Some(object)) = (details, body.as_object_mut()) {
            object.insert("details".to_owned(), details);
        }

        (status_code, Json(body)).into_response()
    }
}
