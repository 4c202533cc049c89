//! The inputs shared by the new and edit form pages.

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    database_id::FormId,
    endpoints::{self, format_endpoint_2},
    form::core::{Form, TransactionWithReceipts},
    html::{BUTTON_DELETE_STYLE, FORM_FIELDSET_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    receipt::MAX_RECEIPTS_PER_TRANSACTION,
    timezone::local_offset_or_error,
    transaction::{AccountLine, Department},
};

/// The file types accepted for receipts.
pub const RECEIPT_ACCEPT: &str = "image/*,.pdf";

/// The name of the input for `field` of the transaction in `row`.
fn input_name(row: u32, field: &str) -> String {
    format!("transactions[{row}].{field}")
}

/// Inputs for the reimbursed person's name and email.
pub fn form_fields_inputs(form_type: &str, form: Option<&Form>) -> Markup {
    let reimbursed_name = form.map(|form| form.reimbursed_name.as_str()).unwrap_or_default();
    let reimbursed_email = form.map(|form| form.reimbursed_email.as_str()).unwrap_or_default();

    html!(
        input type="hidden" name="form_type" value=(form_type);

        div
        {
            label for="reimbursed_name" class=(FORM_LABEL_STYLE) { "Reimbursed Name" }

            input
                name="reimbursed_name"
                id="reimbursed_name"
                type="text"
                required
                value=(reimbursed_name)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="reimbursed_email" class=(FORM_LABEL_STYLE) { "Reimbursed Email" }

            input
                name="reimbursed_email"
                id="reimbursed_email"
                type="email"
                required
                value=(reimbursed_email)
                class=(FORM_TEXT_INPUT_STYLE);
        }
    )
}

/// The values to pre-fill a transaction fieldset with.
pub struct TransactionInputs<'a> {
    /// The unique key of the fieldset on the page.
    pub row: u32,
    /// The stored transaction, or `None` for a new row.
    pub existing: Option<&'a TransactionWithReceipts>,
    /// The date to show for a new row.
    pub default_date: Date,
    /// The form being edited, used for the receipt delete buttons.
    pub form_id: Option<FormId>,
}

/// A fieldset with the inputs for one transaction.
pub fn transaction_fieldset(inputs: TransactionInputs<'_>) -> Markup {
    let row = inputs.row;
    let transaction = inputs.existing.map(|entry| &entry.transaction);
    let receipts = inputs
        .existing
        .map(|entry| entry.receipts.as_slice())
        .unwrap_or_default();
    let date = transaction
        .map(|transaction| transaction.date)
        .unwrap_or(inputs.default_date);
    let amount = transaction.map(|transaction| format!("{:.2}", transaction.amount));
    let date_id = input_name(row, "date");
    let account_line_id = input_name(row, "account_line");
    let department_id = input_name(row, "department");
    let place_vendor_id = input_name(row, "place_vendor");
    let description_id = input_name(row, "description");
    let amount_id = input_name(row, "amount");
    let files_id = input_name(row, "files");
    let remaining_receipts = MAX_RECEIPTS_PER_TRANSACTION.saturating_sub(receipts.len());

    html!(
        fieldset
            class=(FORM_FIELDSET_STYLE)
            data-transaction-row=(row)
        {
            legend class="px-2 text-sm font-semibold" { "Transaction" }

            @if let Some(transaction) = transaction {
                input type="hidden" name=(input_name(row, "id")) value=(transaction.id);
            }

            div class="grid gap-4 md:grid-cols-2"
            {
                div
                {
                    label for=(date_id) class=(FORM_LABEL_STYLE) { "Date" }
                    input
                        name=(date_id)
                        id=(date_id)
                        type="date"
                        required
                        value=(date)
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for=(amount_id) class=(FORM_LABEL_STYLE) { "Amount" }
                    div class="input-wrapper w-full"
                    {
                        input
                            name=(amount_id)
                            id=(amount_id)
                            type="number"
                            step="0.01"
                            min="0.01"
                            placeholder="0.00"
                            required
                            value=[amount]
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }

                div
                {
                    label for=(account_line_id) class=(FORM_LABEL_STYLE) { "Account Line" }
                    select
                        name=(account_line_id)
                        id=(account_line_id)
                        required
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for account_line in AccountLine::ALL {
                            option
                                value=(account_line)
                                selected[transaction.is_some_and(|t| t.account_line == account_line)]
                            {
                                (account_line)
                            }
                        }
                    }
                }

                div
                {
                    label for=(department_id) class=(FORM_LABEL_STYLE) { "Department" }
                    select
                        name=(department_id)
                        id=(department_id)
                        required
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for department in Department::ALL {
                            option
                                value=(department)
                                selected[transaction.is_some_and(|t| t.department == department)]
                            {
                                (department)
                            }
                        }
                    }
                }
            }

            div
            {
                label for=(place_vendor_id) class=(FORM_LABEL_STYLE) { "Place/Vendor" }
                input
                    name=(place_vendor_id)
                    id=(place_vendor_id)
                    type="text"
                    required
                    value=[transaction.map(|t| t.place_vendor.as_str())]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for=(description_id) class=(FORM_LABEL_STYLE) { "Description" }
                input
                    name=(description_id)
                    id=(description_id)
                    type="text"
                    required
                    value=[transaction.map(|t| t.description.as_str())]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !receipts.is_empty() {
                div
                {
                    p class=(FORM_LABEL_STYLE) { "Receipts" }

                    ul class="space-y-1 text-sm"
                    {
                        @for receipt in receipts {
                            li class="flex items-center justify-between gap-2"
                            {
                                span { (receipt.name) }

                                @if let Some(form_id) = inputs.form_id {
                                    button
                                        type="button"
                                        hx-delete=(format_endpoint_2(endpoints::FORM_RECEIPT, form_id, receipt.id))
                                        hx-confirm={ "Delete the receipt " (receipt.name) "?" }
                                        hx-target="closest li"
                                        hx-target-error="#alert-container"
                                        hx-swap="outerHTML"
                                        class=(BUTTON_DELETE_STYLE)
                                    {
                                        "Delete Receipt"
                                    }
                                }
                            }
                        }
                    }
                }
            }

            @if remaining_receipts > 0 {
                div
                {
                    label for=(files_id) class=(FORM_LABEL_STYLE)
                    {
                        "Receipts (up to " (remaining_receipts) ")"
                    }
                    input
                        name=(files_id)
                        id=(files_id)
                        type="file"
                        multiple
                        accept=(RECEIPT_ACCEPT)
                        class="block w-full text-sm";
                }
            }

            @if transaction.is_some() {
                label class="inline-flex items-center gap-2 text-sm text-red-600"
                {
                    input type="checkbox" name=(input_name(row, "remove"));
                    "Remove"
                }
            }
        }
    )
}

/// The button that appends another transaction fieldset to `#transactions`.
pub fn add_transaction_button() -> Markup {
    html!(
        button
            type="button"
            hx-get=(endpoints::TRANSACTION_ROW)
            hx-vals="js:{row: document.querySelectorAll('[data-transaction-row]').length}"
            hx-target="#transactions"
            hx-swap="beforeend"
            class="py-2 px-4 text-sm font-medium text-blue-600 border border-blue-600 rounded hover:bg-blue-50"
        {
            "Add Transaction"
        }
    )
}

/// The state needed for the transaction row fragment.
#[derive(Debug, Clone)]
pub struct TransactionRowState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionRowState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionRowQuery {
    #[serde(default)]
    row: u32,
}

/// A route handler that renders an empty transaction fieldset.
pub async fn get_transaction_row(
    State(state): State<TransactionRowState>,
    Query(query): Query<TransactionRowQuery>,
) -> Response {
    let local_offset = match local_offset_or_error(&state.local_timezone) {
        Ok(offset) => offset,
        Err(error) => return error.into_alert_response(),
    };

    transaction_fieldset(TransactionInputs {
        row: query.row,
        existing: None,
        default_date: OffsetDateTime::now_utc().to_offset(local_offset).date(),
        form_id: None,
    })
    .into_response()
}

/// Today's date in `local_timezone`.
pub fn local_today(local_timezone: &str) -> Result<Date, Error> {
    let local_offset = local_offset_or_error(local_timezone)?;

    Ok(OffsetDateTime::now_utc().to_offset(local_offset).date())
}
