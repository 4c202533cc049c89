//! Deleting a single receipt, checking that it belongs to the form the caller is editing.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    alert::Alert,
    database_id::{FormId, ReceiptId},
    endpoints::{self, format_endpoint},
    page_cache::PageCache,
    receipt::get_receipt,
    transaction::get_transaction_form_id,
};

/// The state needed to delete a receipt.
#[derive(Debug, Clone)]
pub struct DeleteReceiptState {
    /// The database connection for managing receipts.
    db_connection: Arc<Mutex<Connection>>,
    page_cache: PageCache,
}

impl FromRef<AppState> for DeleteReceiptState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            page_cache: state.page_cache.clone(),
        }
    }
}

/// Delete the receipt `receipt_id` if its transaction belongs to the form `form_id`.
///
/// # Errors
/// - [Error::ReceiptNotFound] if there is no such receipt.
/// - [Error::TransactionNotFound] if the receipt's transaction no longer exists.
/// - [Error::Unauthorized] if the transaction belongs to another form. Nothing is deleted.
pub fn delete_receipt(
    form_id: FormId,
    receipt_id: ReceiptId,
    connection: &Connection,
) -> Result<(), Error> {
    let receipt = get_receipt(receipt_id, connection)?.ok_or(Error::ReceiptNotFound(receipt_id))?;

    let owner_form_id = get_transaction_form_id(receipt.transaction_id, connection)?
        .ok_or(Error::TransactionNotFound(receipt.transaction_id))?;

    if owner_form_id != form_id {
        tracing::warn!(
            "Refused to delete receipt {receipt_id}: it belongs to form {owner_form_id}, not form {form_id}"
        );
        return Err(Error::Unauthorized);
    }

    connection.execute(
        "DELETE FROM receipt WHERE id = :id",
        &[(":id", &receipt_id)],
    )?;

    Ok(())
}

async fn delete_and_revalidate(
    state: &DeleteReceiptState,
    form_id: FormId,
    receipt_id: ReceiptId,
) -> Result<(), Error> {
    {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        delete_receipt(form_id, receipt_id, &connection)?;
    }

    state
        .page_cache
        .revalidate(&format_endpoint(endpoints::FORM_VIEW, form_id))
        .await;

    Ok(())
}

/// A route handler for deleting a receipt from the edit page, responds with an alert.
pub async fn delete_receipt_endpoint(
    State(state): State<DeleteReceiptState>,
    Path((form_id, receipt_id)): Path<(FormId, ReceiptId)>,
) -> Response {
    match delete_and_revalidate(&state, form_id, receipt_id).await {
        // The status code has to be 200 OK or HTMX will not remove the receipt.
        Ok(()) => Alert::SuccessSimple {
            message: "Receipt deleted".to_owned(),
        }
        .into_response(),
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for deleting a receipt through the JSON API.
pub async fn delete_receipt_api(
    State(state): State<DeleteReceiptState>,
    Path((form_id, receipt_id)): Path<(FormId, ReceiptId)>,
) -> Response {
    match delete_and_revalidate(&state, form_id, receipt_id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(error) => error.into_json_response(),
    }
}
