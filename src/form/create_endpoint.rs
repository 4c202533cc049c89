//! Defines the endpoint for submitting a new form from the HTML page.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Identity,
    database_id::FormId,
    endpoints::{self, format_endpoint},
    form::{
        create::create_form,
        multipart::{check_receipt_limit, read_form_multipart},
        submission::NewFormRequest,
    },
    page_cache::PageCache,
};

/// The state needed to create a form.
#[derive(Debug, Clone)]
pub struct CreateFormState {
    /// The database connection for managing forms.
    pub db_connection: Arc<Mutex<Connection>>,
    pub page_cache: PageCache,
}

impl FromRef<AppState> for CreateFormState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            page_cache: state.page_cache.clone(),
        }
    }
}

/// Validate and store `request`, then mark the dashboard as stale.
///
/// Shared by the HTML and JSON endpoints.
pub async fn store_new_form(
    state: &CreateFormState,
    identity: &Identity,
    request: NewFormRequest,
) -> Result<FormId, Error> {
    let form_id = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        check_receipt_limit(&request.transactions, &connection)?;
        let submission = request.into_submission()?;

        create_form(&submission, identity, &connection)?
    };

    tracing::info!("{} submitted form {form_id}", identity.user_id);
    state.page_cache.revalidate(endpoints::DASHBOARD_VIEW).await;

    Ok(form_id)
}

/// A route handler for submitting a new form, redirects to the form's page on success.
pub async fn create_form_endpoint(
    State(state): State<CreateFormState>,
    Extension(identity): Extension<Identity>,
    multipart: Multipart,
) -> Response {
    let request = match read_form_multipart(multipart)
        .await
        .and_then(|form| form.into_new_form_request())
    {
        Ok(request) => request,
        Err(error) => return error.into_alert_response(),
    };

    match store_new_form(&state, &identity, request).await {
        Ok(form_id) => (
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

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        form::{
            create_endpoint::{CreateFormState, create_form_endpoint},
            read::{get_form_graph, list_forms},
            test_utils::test_identity,
        },
        page_cache::PageCache,
        test_utils::{MultipartPart, assert_hx_redirect, must_make_multipart, parse_html_fragment},
    };

    fn get_test_state() -> CreateFormState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        CreateFormState {
            db_connection: Arc::new(Mutex::new(connection)),
            page_cache: PageCache::new(),
        }
    }

    fn form_parts<'a>(files: &'a [(&'a str, &'a [u8])]) -> Vec<MultipartPart<'a>> {
        let mut parts = vec![
            MultipartPart::text("form_type", "REIMBURSEMENT"),
            MultipartPart::text("reimbursed_name", "Alex Doe"),
            MultipartPart::text("reimbursed_email", "alex@example.com"),
            MultipartPart::text("transactions[0].date", "2025-02-01"),
            MultipartPart::text("transactions[0].account_line", "Missions"),
            MultipartPart::text("transactions[0].department", "Youth"),
            MultipartPart::text("transactions[0].place_vendor", "Costco"),
            MultipartPart::text("transactions[0].description", "Snacks"),
            MultipartPart::text("transactions[0].amount", "12.50"),
        ];

        for (name, bytes) in files {
            parts.push(MultipartPart::file(
                "transactions[0].files",
                name,
                "image/png",
                bytes,
            ));
        }

        parts
    }

    #[tokio::test]
    async fn creates_form_and_redirects_to_it() {
        let state = get_test_state();
        let files: [(&str, &[u8]); 1] = [("snacks.png", b"pretend these are png bytes")];

        let response = create_form_endpoint(
            State(state.clone()),
            Extension(test_identity()),
            must_make_multipart(&form_parts(&files)).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let connection = state.db_connection.lock().unwrap();
        let forms = list_forms(None, &connection).unwrap();
        assert_eq!(forms.len(), 1);
        assert_hx_redirect(&response, &format!("/forms/{}", forms[0].id));
        assert_eq!(forms[0].submitter_email, "pat@example.com");

        let graph = get_form_graph(forms[0].id, false, &connection)
            .unwrap()
            .unwrap();
        assert_eq!(graph.transactions.len(), 1);
        assert_eq!(graph.transactions[0].receipts.len(), 1);
        assert_eq!(graph.transactions[0].receipts[0].name, "snacks.png");
    }

    #[tokio::test]
    async fn rejects_more_than_two_receipts() {
        let state = get_test_state();
        let files: [(&str, &[u8]); 3] = [
            ("a.png", b"pretend these are png bytes"),
            ("b.png", b"pretend these are png bytes"),
            ("c.png", b"pretend these are png bytes"),
        ];

        let response = create_form_endpoint(
            State(state.clone()),
            Extension(test_identity()),
            must_make_multipart(&form_parts(&files)).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("transactions[0].newFiles"), "got {text}");

        let connection = state.db_connection.lock().unwrap();
        assert!(list_forms(None, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_email_leaves_database_untouched() {
        let state = get_test_state();
        let mut parts = form_parts(&[]);
        parts[2] = MultipartPart::text("reimbursed_email", "not an email");

        let response = create_form_endpoint(
            State(state.clone()),
            Extension(test_identity()),
            must_make_multipart(&parts).await,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let connection = state.db_connection.lock().unwrap();
        assert!(list_forms(None, &connection).unwrap().is_empty());
    }
}
