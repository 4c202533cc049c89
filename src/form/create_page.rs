//! Defines the route handler for the page for filling in a new form.

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error, endpoints,
    form::{
        core::DEFAULT_FORM_TYPE,
        fields::{
            TransactionInputs, add_transaction_button, form_fields_inputs, local_today,
            transaction_fieldset,
        },
    },
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner,
    },
    navigation::NavBar,
};

fn create_form_view(form_type: &str, today: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_FORM_VIEW).into_html();
    let spinner = loading_spinner();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(endpoints::FORMS)
                hx-encoding="multipart/form-data"
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "New " (form_type.to_lowercase()) " form" }

                (form_fields_inputs(form_type, None))

                div id="transactions" class="space-y-4"
                {
                    (transaction_fieldset(TransactionInputs {
                        row: 0,
                        existing: None,
                        default_date: today,
                        form_id: None,
                    }))
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
                    " Submit Form"
                }
            }
        }
    };

    base("New Form", &[dollar_input_styles()], &content)
}

/// The state needed for the new form page.
#[derive(Debug, Clone)]
pub struct CreateFormPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateFormPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFormQuery {
    #[serde(rename = "type")]
    form_type: Option<String>,
}

/// Renders the page for filling in a new form.
pub async fn get_create_form_page(
    State(state): State<CreateFormPageState>,
    Query(query): Query<CreateFormQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let form_type = query
        .form_type
        .filter(|form_type| !form_type.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FORM_TYPE.to_owned());

    Ok(create_form_view(&form_type, today).into_response())
}
