//! The dashboard: a table of every submitted form.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    AppState, Error,
    auth::Identity,
    endpoints::{self, format_endpoint},
    form::{Form, list_forms},
    html::{
        BUTTON_SECONDARY_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, view_delete_action_links,
    },
    navigation::NavBar,
    page_cache::PageCache,
    timezone::{format_local_timestamp, local_offset_or_error},
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub page_cache: PageCache,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            page_cache: state.page_cache.clone(),
        }
    }
}

fn form_row(form: &Form, local_offset: UtcOffset) -> Markup {
    let form_url = format_endpoint(endpoints::FORM_VIEW, form.id);
    let confirm_message = format!(
        "Delete the form for {}? Its transactions and receipts will be deleted too.",
        form.reimbursed_name
    );

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (form.reimbursed_name) }
            td class=(TABLE_CELL_STYLE) { (form.submitter_name) }
            td class=(TABLE_CELL_STYLE) { (format_local_timestamp(form.created_at, local_offset)) }
            td class={(TABLE_CELL_STYLE) " flex gap-4"}
            {
                (view_delete_action_links(
                    &form_url,
                    &form_url,
                    &confirm_message,
                    "closest tr",
                    "outerHTML",
                ))
            }
        }
    )
}

fn dashboard_view(identity: &Identity, forms: &[Form], local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let new_form_url = format!("{}?type=REIMBURSEMENT", endpoints::NEW_FORM_VIEW);

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                div class="flex items-center justify-between"
                {
                    h1 class="text-2xl font-bold" { "Welcome, " (identity.display_name()) }
                    a href=(new_form_url) class=(BUTTON_SECONDARY_STYLE) { "Create New Form" }
                }

                @if forms.is_empty() {
                    p class="text-gray-500" { "No forms found." }
                } @else {
                    div class="overflow-x-auto rounded-lg shadow"
                    {
                        table class="w-full text-sm text-left"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Reimbursed" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Submitted By" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Created" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                                }
                            }
                            tbody
                            {
                                @for form in forms {
                                    (form_row(form, local_offset))
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Display a page listing every form, newest first.
///
/// Pages are cached per user since the greeting differs between users.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, Error> {
    let generation = state.page_cache.generation(endpoints::DASHBOARD_VIEW).await;

    if let Some(page) = state
        .page_cache
        .get(endpoints::DASHBOARD_VIEW, &identity.user_id)
        .await
    {
        return Ok(Html(page).into_response());
    }

    let local_offset = local_offset_or_error(&state.local_timezone)?;

    let forms = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        list_forms(None, &connection)
            .inspect_err(|error| tracing::error!("could not list forms: {error}"))?
    };

    let page = dashboard_view(&identity, &forms, local_offset).into_string();
    state
        .page_cache
        .insert(
            endpoints::DASHBOARD_VIEW,
            &identity.user_id,
            generation,
            page.clone(),
        )
        .await;

    Ok(Html(page).into_response())
}
