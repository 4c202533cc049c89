//! Defines the endpoints for deleting a form.

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
    database_id::FormId,
    endpoints::{self, format_endpoint},
    form::delete::delete_form,
    page_cache::PageCache,
};

/// The state needed to delete a form.
#[derive(Debug, Clone)]
pub struct DeleteFormState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub page_cache: PageCache,
}

impl FromRef<AppState> for DeleteFormState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            page_cache: state.page_cache.clone(),
        }
    }
}

async fn delete_and_revalidate(state: &DeleteFormState, form_id: FormId) -> Result<(), Error> {
    {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        delete_form(form_id, &connection)?;
    }

    tracing::info!("deleted form {form_id}");
    state.page_cache.revalidate(endpoints::DASHBOARD_VIEW).await;
    state
        .page_cache
        .revalidate(&format_endpoint(endpoints::FORM_VIEW, form_id))
        .await;

    Ok(())
}

/// A route handler for deleting a form from the dashboard, responds with an alert.
pub async fn delete_form_endpoint(
    State(state): State<DeleteFormState>,
    Path(form_id): Path<FormId>,
) -> Response {
    match delete_and_revalidate(&state, form_id).await {
        // HTMX only swaps out the table row on a 200 OK.
        Ok(()) => Alert::SuccessSimple {
            message: "Form deleted".to_owned(),
        }
        .into_response(),
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for deleting a form through the JSON API.
pub async fn delete_form_api(
    State(state): State<DeleteFormState>,
    Path(form_id): Path<FormId>,
) -> Response {
    match delete_and_revalidate(&state, form_id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(error) => error.into_json_response(),
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
            delete_endpoint::{DeleteFormState, delete_form_endpoint},
            test_utils::{insert_test_form, insert_test_transaction},
        },
        page_cache::PageCache,
        test_utils::assert_status_ok,
    };

    fn get_test_state() -> DeleteFormState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        DeleteFormState {
            db_connection: Arc::new(Mutex::new(connection)),
            page_cache: PageCache::new(),
        }
    }

    #[tokio::test]
    async fn deletes_form_and_clears_cached_pages() {
        let state = get_test_state();
        let form_id = {
            let connection = state.db_connection.lock().unwrap();
            let form_id = insert_test_form(&connection);
            insert_test_transaction(form_id, &connection);
            form_id
        };
        let form_path = format!("/forms/{form_id}");
        state
            .page_cache
            .insert(&form_path, "all", 0, "<p>stale</p>".to_owned())
            .await;

        let response = delete_form_endpoint(State(state.clone()), Path(form_id)).await;

        assert_status_ok(&response);
        assert!(state.page_cache.get(&form_path, "all").await.is_none());
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_form(form_id, &connection).unwrap(), None);
    }

    #[tokio::test]
    async fn missing_form_is_not_found() {
        let state = get_test_state();

        let response = delete_form_endpoint(State(state), Path(42)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
