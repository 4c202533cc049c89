//! The JSON API for forms.
//!
//! Every handler answers with JSON, failures use the `{success: false, error, details?}`
//! envelope produced by [Error::into_json_response](crate::Error).

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    auth::Identity,
    database_id::FormId,
    form::{
        create_endpoint::{CreateFormState, store_new_form},
        edit_endpoint::{UpdateFormState, store_form_update},
        read::{get_form_graph, list_forms},
        submission::{NewFormRequest, UpdateFormRequest},
    },
    validation::FieldError,
};

/// The state needed to read forms.
#[derive(Debug, Clone)]
pub struct ReadFormsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReadFormsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl ReadFormsState {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

/// Report a body that could not be read as JSON in the error envelope.
fn rejection_error(rejection: JsonRejection) -> Error {
    tracing::debug!("rejected JSON body: {rejection}");
    Error::Validation(vec![FieldError::new("body", rejection.body_text())])
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFormsQuery {
    user_id: Option<String>,
}

/// A route handler that lists forms, newest first.
pub async fn list_forms_api(
    State(state): State<ReadFormsState>,
    Query(query): Query<ListFormsQuery>,
) -> Response {
    let forms = state
        .lock()
        .and_then(|connection| list_forms(query.user_id.as_deref(), &connection));

    match forms {
        Ok(forms) => Json(forms).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// A route handler for creating a form from a JSON body.
pub async fn create_form_api(
    State(state): State<CreateFormState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<NewFormRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_error(rejection).into_json_response(),
    };

    match store_new_form(&state, &identity, request).await {
        Ok(form_id) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "formId": form_id })),
        )
            .into_response(),
        Err(error) => error.into_json_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetFormQuery {
    #[serde(default)]
    skip_receipts: bool,
}

/// A route handler that returns a form with its transactions and, unless `skip_receipts` is
/// set, their receipts.
pub async fn get_form_api(
    State(state): State<ReadFormsState>,
    Path(form_id): Path<FormId>,
    Query(query): Query<GetFormQuery>,
) -> Response {
    let graph = state
        .lock()
        .and_then(|connection| get_form_graph(form_id, query.skip_receipts, &connection));

    match graph {
        Ok(Some(graph)) => Json(graph).into_response(),
        Ok(None) => Error::FormNotFound(form_id).into_json_response(),
        Err(error) => error.into_json_response(),
    }
}

/// A route handler for saving an edited form from a JSON body.
pub async fn update_form_api(
    State(state): State<UpdateFormState>,
    Path(form_id): Path<FormId>,
    payload: Result<Json<UpdateFormRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_error(rejection).into_json_response(),
    };

    match store_form_update(&state, form_id, request).await {
        Ok(graph) => Json(json!({
            "success": true,
            "form": graph.form,
            "transactions": graph.transactions,
        }))
        .into_response(),
        Err(error) => error.into_json_response(),
    }
}
