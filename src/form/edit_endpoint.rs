//! Defines the endpoint for saving an edited form from the HTML page.
use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::FormId,
    endpoints::{self, format_endpoint},
    form::{
        core::FormGraph,
        multipart::{check_receipt_limit, read_form_multipart},
        reconcile::update_form_with_files,
        submission::UpdateFormRequest,
    },
    page_cache::PageCache,
};

/// The state needed to update a form.
#[derive(Debug, Clone)]
pub struct UpdateFormState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub page_cache: PageCache,
}

impl FromRef<AppState> for UpdateFormState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            page_cache: state.page_cache.clone(),
        }
    }
}

/// Validate `request` and apply it to the form `form_id`, then mark the pages showing the form
/// as stale.
pub async fn store_form_update(
    state: &UpdateFormState,
    form_id: FormId,
    request: UpdateFormRequest,
) -> Result<FormGraph, Error> {
    let graph = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        check_receipt_limit(&request.transactions, &connection)?;
        let update = request.into_update(form_id)?;

        update_form_with_files(form_id, &update, &connection)?
    };

    tracing::info!("updated form {form_id}");
    state.page_cache.revalidate(endpoints::DASHBOARD_VIEW).await;
    state
        .page_cache
        .revalidate(&format_endpoint(endpoints::FORM_VIEW, form_id))
        .await;

    Ok(graph)
}

/// A route handler for saving the edit page, redirects to the form's page on success.
pub async fn update_form_endpoint(
    State(state): State<UpdateFormState>,
    Path(form_id): Path<FormId>,
    multipart: Multipart,
) -> Response {
    let request = match read_form_multipart(multipart)
        .await
        .and_then(|form| form.into_update_form_request())
    {
        Ok(request) => request,
        Err(error) => return error.into_alert_response(),
    };

    match store_form_update(&state, form_id, request).await {
        Ok(_) => (
            HxRedirect(format_endpoint(endpoints::FORM_VIEW, form_id)),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        form::{
            core::get_form,
            edit_endpoint::{UpdateFormState, update_form_endpoint},
            read::get_form_graph,
            test_utils::{insert_test_form, insert_test_transaction},
        },
        page_cache::PageCache,
        receipt::{ReceiptFile, insert_receipt},
        test_utils::{MultipartPart, assert_hx_redirect, must_make_multipart},
    };

    fn get_test_state() -> (UpdateFormState, i64, i64) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let form_id = insert_test_form(&connection);
        let transaction_id = insert_test_transaction(form_id, &connection);

        let state = UpdateFormState {
            db_connection: Arc::new(Mutex::new(connection)),
            page_cache: PageCache::new(),
        };

        (state, form_id, transaction_id)
    }

    const ROW_FIELDS: [[&str; 7]; 2] = [
        [
            "transactions[0].date",
            "transactions[0].account_line",
            "transactions[0].department",
            "transactions[0].place_vendor",
            "transactions[0].description",
            "transactions[0].amount",
            "transactions[0].id",
        ],
        [
            "transactions[1].date",
            "transactions[1].account_line",
            "transactions[1].department",
            "transactions[1].place_vendor",
            "transactions[1].description",
            "transactions[1].amount",
            "transactions[1].id",
        ],
    ];

    fn row_parts<'a>(row: usize, id: Option<&'a str>, amount: &'a str) -> Vec<MultipartPart<'a>> {
        let [date, account_line, department, place_vendor, description, amount_name, id_name] =
            ROW_FIELDS[row];
        let mut parts = vec![
            MultipartPart::text(date, "2025-02-03"),
            MultipartPart::text(account_line, "General Fund"),
            MultipartPart::text(department, "Admin"),
            MultipartPart::text(place_vendor, "Staples"),
            MultipartPart::text(description, "Paper"),
            MultipartPart::text(amount_name, amount),
        ];

        if let Some(id) = id {
            parts.push(MultipartPart::text(id_name, id));
        }

        parts
    }

    fn header_parts<'a>() -> Vec<MultipartPart<'a>> {
        vec![
            MultipartPart::text("form_type", "REIMBURSEMENT"),
            MultipartPart::text("reimbursed_name", "Robin Diaz"),
            MultipartPart::text("reimbursed_email", "robin@example.com"),
        ]
    }

    #[tokio::test]
    async fn updates_existing_and_adds_new_rows() {
        let (state, form_id, transaction_id) = get_test_state();
        let id = transaction_id.to_string();
        let mut parts = header_parts();
        parts.extend(row_parts(0, Some(&id), "40.00"));
        parts.extend(row_parts(1, None, "2.50"));

        let response = update_form_endpoint(
            State(state.clone()),
            Path(form_id),
            must_make_multipart(&parts).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, &format!("/forms/{form_id}"));

        let connection = state.db_connection.lock().unwrap();
        let graph = get_form_graph(form_id, true, &connection).unwrap().unwrap();
        assert_eq!(graph.form.reimbursed_name, "Robin Diaz");
        assert_eq!(graph.transactions.len(), 2);
        let updated = graph
            .transactions
            .iter()
            .find(|entry| entry.transaction.id == transaction_id)
            .unwrap();
        assert_eq!(updated.transaction.amount, 40.0);
        assert_eq!(graph.total_amount(), 42.5);
    }

    #[tokio::test]
    async fn removed_rows_are_deleted() {
        let (state, form_id, transaction_id) = get_test_state();
        let id = transaction_id.to_string();
        let mut parts = header_parts();
        parts.extend(row_parts(0, Some(&id), "40.00"));
        parts.push(MultipartPart::text("transactions[0].remove", "on"));
        parts.extend(row_parts(1, None, "2.50"));

        let response = update_form_endpoint(
            State(state.clone()),
            Path(form_id),
            must_make_multipart(&parts).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let connection = state.db_connection.lock().unwrap();
        let graph = get_form_graph(form_id, true, &connection).unwrap().unwrap();
        assert_eq!(graph.transactions.len(), 1);
        assert_ne!(graph.transactions[0].transaction.id, transaction_id);
    }

    #[tokio::test]
    async fn receipt_limit_counts_stored_receipts() {
        let (state, form_id, transaction_id) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            for name in ["a.png", "b.png"] {
                insert_receipt(
                    transaction_id,
                    &ReceiptFile {
                        name: name.to_owned(),
                        file_type: "image/png".to_owned(),
                        base64_content: "aGVsbG8gd29ybGQgaGVsbG8=".to_owned(),
                    },
                    &connection,
                )
                .unwrap();
            }
        }
        let id = transaction_id.to_string();
        let mut parts = header_parts();
        parts.extend(row_parts(0, Some(&id), "40.00"));
        parts.push(MultipartPart::file(
            "transactions[0].files",
            "c.png",
            "image/png",
            b"pretend these are png bytes",
        ));

        let response = update_form_endpoint(
            State(state.clone()),
            Path(form_id),
            must_make_multipart(&parts).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let connection = state.db_connection.lock().unwrap();
        let form = get_form(form_id, &connection).unwrap().unwrap();
        assert_eq!(form.reimbursed_name, "Alex Doe", "nothing should be written");
    }

    #[tokio::test]
    async fn missing_form_is_not_found() {
        let (state, _, _) = get_test_state();
        let mut parts = header_parts();
        parts.extend(row_parts(0, None, "2.50"));

        let response = update_form_endpoint(
            State(state),
            Path(999),
            must_make_multipart(&parts).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
