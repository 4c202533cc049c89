//! Defines the route handler for the page for editing a submitted form.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    database_id::FormId,
    endpoints::{self, format_endpoint},
    error_page::get_404_not_found_response,
    form::{
        core::FormGraph,
        fields::{
            TransactionInputs, add_transaction_button, form_fields_inputs, local_today,
            transaction_fieldset,
        },
        read::get_form_graph,
    },
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, LINK_STYLE, base, dollar_input_styles,
        loading_spinner,
    },
    navigation::NavBar,
};

fn edit_form_view(graph: &FormGraph, today: Date) -> Markup {
    let form = &graph.form;
    let nav_bar = NavBar::new(endpoints::EDIT_FORM_VIEW).into_html();
    let form_url = format_endpoint(endpoints::FORM_VIEW, form.id);
    let spinner = loading_spinner();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(form_url)
                hx-encoding="multipart/form-data"
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                class="w-full space-y-4 md:space-y-6"
            {
                div class="flex items-center justify-between"
                {
                    h2 class="text-xl font-bold" { "Edit Form #" (form.id) }
                    a href=(form_url) class=(LINK_STYLE) { "Cancel" }
                }

                p class="text-sm text-gray-500"
                {
                    "Submitted by " (form.submitter_name) " (" (form.submitter_email) ")"
                }

                (form_fields_inputs(&form.form_type, Some(form)))

                div id="transactions" class="space-y-4"
                {
                    @for (row, entry) in (0u32..).zip(&graph.transactions) {
                        (transaction_fieldset(TransactionInputs {
                            row,
                            existing: Some(entry),
                            default_date: today,
                            form_id: Some(form.id),
                        }))
                    }
                }

                (add_transaction_button())

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (spinner)
                    }
                    " Save Changes"
                }
            }
        }
    };

    base(
        &format!("Edit Form #{}", form.id),
        &[dollar_input_styles()],
        &content,
    )
}

/// The state needed for the edit form page.
#[derive(Debug, Clone)]
pub struct EditFormPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditFormPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for editing the form `form_id`, pre-filled with its stored values.
pub async fn get_edit_form_page(
    State(state): State<EditFormPageState>,
    Path(form_id): Path<FormId>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    let graph = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        get_form_graph(form_id, false, &connection)?
    };

    match graph {
        Some(graph) => Ok(edit_form_view(&graph, today).into_response()),
        None => Ok(get_404_not_found_response()),
    }
}
