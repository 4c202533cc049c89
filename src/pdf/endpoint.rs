//! The route handler for downloading a form as a PDF.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::FormId,
    form::{get_form_graph, pdf_file_name},
    pdf::generator::generate_form_pdf,
    timezone::local_offset_or_error,
};

/// The state needed to export a form.
#[derive(Debug, Clone)]
pub struct FormPdfState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for FormPdfState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

async fn build_form_pdf(state: &FormPdfState, form_id: FormId) -> Result<(String, Vec<u8>), Error> {
    let local_offset = local_offset_or_error(&state.local_timezone)?;

    let graph = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        get_form_graph(form_id, false, &connection)?.ok_or(Error::FormNotFound(form_id))?
    };

    let file_name = pdf_file_name(&graph.form);

    // Decoding and embedding receipt images is CPU bound.
    let pdf = tokio::task::spawn_blocking(move || generate_form_pdf(&graph, local_offset))
        .await
        .map_err(|error| {
            tracing::error!("PDF generation task failed: {error}");
            Error::PdfError(error.to_string())
        })??;

    Ok((file_name, pdf))
}

/// A route handler that responds with the form `form_id` as a PDF attachment.
pub async fn get_form_pdf(
    State(state): State<FormPdfState>,
    Path(form_id): Path<FormId>,
) -> Response {
    match build_form_pdf(&state, form_id).await {
        Ok((file_name, pdf)) => {
            tracing::info!("exported form {form_id} as {file_name} ({} bytes)", pdf.len());

            (
                [
                    (CONTENT_TYPE, "application/pdf".to_owned()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                pdf,
            )
                .into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
