//! The read-only page for a form, and the receipts panel it loads after the first paint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    AppState, Error,
    database_id::FormId,
    endpoints::{self, format_endpoint},
    error_page::get_404_not_found_response,
    form::{core::FormGraph, read::get_form_graph},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, loading_spinner,
    },
    navigation::NavBar,
    page_cache::PageCache,
    receipt::Receipt,
    timezone::{format_local_timestamp, local_offset_or_error},
};

/// The page cache variant for the form page, which looks the same for every user.
const FORM_PAGE_VARIANT: &str = "all";

/// The state needed for the form page and its receipts panel.
#[derive(Debug, Clone)]
pub struct FormPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub page_cache: PageCache,
}

impl FromRef<AppState> for FormPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            page_cache: state.page_cache.clone(),
        }
    }
}

fn detail(label: &str, value: &str) -> Markup {
    html!(
        div
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd class="font-medium" { (value) }
        }
    )
}

fn form_view(graph: &FormGraph, local_offset: UtcOffset) -> Markup {
    let form = &graph.form;
    let nav_bar = NavBar::new(endpoints::FORM_VIEW).into_html();
    let edit_url = format_endpoint(endpoints::EDIT_FORM_VIEW, form.id);
    let pdf_url = format_endpoint(endpoints::FORM_PDF, form.id);
    let receipts_url = format_endpoint(endpoints::FORM_RECEIPTS_VIEW, form.id);

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-6"
            {
                div class="flex items-center justify-between"
                {
                    h1 class="text-2xl font-bold" { (form.form_type) " Form #" (form.id) }

                    div class="flex gap-4"
                    {
                        a href=(edit_url) class=(LINK_STYLE) { "Edit" }
                        a href=(pdf_url) class=(LINK_STYLE) { "Download PDF" }
                    }
                }

                section
                {
                    h2 class="text-lg font-semibold mb-2" { "Form Details" }
                    dl class="grid gap-4 md:grid-cols-2"
                    {
                        (detail("Submitted By", &form.submitter_name))
                        (detail("Submitter Email", &form.submitter_email))
                        (detail("Created", &format_local_timestamp(form.created_at, local_offset)))
                        (detail("Updated", &format_local_timestamp(form.updated_at, local_offset)))
                        (detail("Total Amount", &format_currency(graph.total_amount())))
                    }
                }

                section
                {
                    h2 class="text-lg font-semibold mb-2" { "Reimbursement Information" }
                    dl class="grid gap-4 md:grid-cols-2"
                    {
                        (detail("Reimbursed To", &form.reimbursed_name))
                        (detail("Reimbursed Email", &form.reimbursed_email))
                    }
                }

                section
                {
                    h2 class="text-lg font-semibold mb-2" { "Transactions" }
                    div class="overflow-x-auto"
                    {
                        table class="w-full text-sm text-left"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th class=(TABLE_CELL_STYLE) { "Date" }
                                    th class=(TABLE_CELL_STYLE) { "Account Line" }
                                    th class=(TABLE_CELL_STYLE) { "Department" }
                                    th class=(TABLE_CELL_STYLE) { "Place/Vendor" }
                                    th class=(TABLE_CELL_STYLE) { "Description" }
                                    th class=(TABLE_CELL_STYLE) { "Amount" }
                                }
                            }
                            tbody
                            {
                                @for entry in &graph.transactions {
                                    @let transaction = &entry.transaction;
                                    tr class=(TABLE_ROW_STYLE)
                                    {
                                        td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                        td class=(TABLE_CELL_STYLE) { (transaction.account_line) }
                                        td class=(TABLE_CELL_STYLE) { (transaction.department) }
                                        td class=(TABLE_CELL_STYLE) { (transaction.place_vendor) }
                                        td class=(TABLE_CELL_STYLE) { (transaction.description) }
                                        td class=(TABLE_CELL_STYLE) { (format_currency(transaction.amount)) }
                                    }
                                }
                            }
                        }
                    }
                }

                section
                {
                    h2 class="text-lg font-semibold mb-2" { "Receipts" }
                    div
                        id="receipts"
                        hx-get=(receipts_url)
                        hx-trigger="load"
                        hx-swap="outerHTML"
                    {
                        (loading_spinner()) "Loading receipts..."
                    }
                }
            }
        }
    );

    base(&format!("Form #{}", form.id), &[], &content)
}

/// A `src`/`href` for the receipt's content.
fn receipt_url(receipt: &Receipt) -> String {
    if receipt.base64_content.starts_with("data:") {
        receipt.base64_content.clone()
    } else {
        format!(
            "data:{};base64,{}",
            receipt.file_type, receipt.base64_content
        )
    }
}

fn receipts_panel(graph: &FormGraph) -> Markup {
    let has_receipts = graph
        .transactions
        .iter()
        .any(|entry| !entry.receipts.is_empty());

    html!(
        div id="receipts" class="space-y-6"
        {
            @if !has_receipts {
                p class="text-gray-500" { "No receipts attached." }
            }

            @for (index, entry) in graph.transactions.iter().enumerate() {
                @if !entry.receipts.is_empty() {
                    div
                    {
                        h3 class="font-semibold mb-2" { "Receipts for Transaction #" (index + 1) ":" }

                        ul class="grid gap-4 md:grid-cols-2"
                        {
                            @for receipt in &entry.receipts {
                                li class="space-y-2"
                                {
                                    @if receipt.file_type.starts_with("image/") {
                                        img
                                            src=(receipt_url(receipt))
                                            alt=(receipt.name)
                                            class="max-h-96 rounded border";
                                    }

                                    a
                                        href=(receipt_url(receipt))
                                        download=(receipt.name)
                                        class=(LINK_STYLE)
                                    {
                                        (receipt.name)
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn lock_and_get_graph(
    state: &FormPageState,
    form_id: FormId,
    skip_receipts: bool,
) -> Result<Option<FormGraph>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_form_graph(form_id, skip_receipts, &connection)
}

/// Renders the read-only page for a form.
///
/// Receipts are left out of the first paint and loaded by [get_form_receipts].
pub async fn get_form_page(
    State(state): State<FormPageState>,
    Path(form_id): Path<FormId>,
) -> Result<Response, Error> {
    let path = format_endpoint(endpoints::FORM_VIEW, form_id);
    let generation = state.page_cache.generation(&path).await;

    if let Some(page) = state.page_cache.get(&path, FORM_PAGE_VARIANT).await {
        return Ok(Html(page).into_response());
    }

    let local_offset = local_offset_or_error(&state.local_timezone)?;

    let Some(graph) = lock_and_get_graph(&state, form_id, true)? else {
        return Ok(get_404_not_found_response());
    };

    let page = form_view(&graph, local_offset).into_string();
    state
        .page_cache
        .insert(&path, FORM_PAGE_VARIANT, generation, page.clone())
        .await;

    Ok(Html(page).into_response())
}

/// Renders the receipts panel of a form.
pub async fn get_form_receipts(
    State(state): State<FormPageState>,
    Path(form_id): Path<FormId>,
) -> Response {
    match lock_and_get_graph(&state, form_id, false) {
        Ok(Some(graph)) => receipts_panel(&graph).into_response(),
        Ok(None) => Error::FormNotFound(form_id).into_alert_response(),
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
    use scraper::Selector;

    use crate::{
        db::initialize,
        form::{
            test_utils::{insert_test_form, insert_test_transaction},
            view_page::{FormPageState, get_form_page, get_form_receipts},
        },
        page_cache::PageCache,
        receipt::{ReceiptFile, insert_receipt},
        test_utils::{assert_valid_html, parse_html_document, parse_html_fragment},
    };

    fn get_test_state() -> (FormPageState, i64, i64) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let form_id = insert_test_form(&connection);
        let transaction_id = insert_test_transaction(form_id, &connection);
        insert_receipt(
            transaction_id,
            &ReceiptFile {
                name: "strings.png".to_owned(),
                file_type: "image/png".to_owned(),
                base64_content: "data:image/png;base64,aGVsbG8gd29ybGQgaGVsbG8=".to_owned(),
            },
            &connection,
        )
        .unwrap();

        let state = FormPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
            page_cache: PageCache::new(),
        };

        (state, form_id, transaction_id)
    }

    #[tokio::test]
    async fn form_page_lazy_loads_receipts() {
        let (state, form_id, _) = get_test_state();

        let response = get_form_page(State(state), Path(form_id)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert!(
            html.select(&Selector::parse("img").unwrap()).next().is_none(),
            "receipts should not be part of the first paint"
        );
        let panel = html
            .select(&Selector::parse("#receipts").unwrap())
            .next()
            .expect("No receipts panel");
        assert_eq!(
            panel.value().attr("hx-get"),
            Some(format!("/forms/{form_id}/receipts").as_str())
        );
        let rows = html.select(&Selector::parse("tbody tr").unwrap()).count();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn form_page_is_served_from_cache() {
        let (state, form_id, _) = get_test_state();
        get_form_page(State(state.clone()), Path(form_id))
            .await
            .unwrap();
        state
            .db_connection
            .lock()
            .unwrap()
            .execute("UPDATE form SET reimbursed_name = 'Changed Behind The Cache'", ())
            .unwrap();

        let response = get_form_page(State(state), Path(form_id)).await.unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(!text.contains("Changed Behind The Cache"));
    }

    #[tokio::test]
    async fn missing_form_is_404() {
        let (state, _, _) = get_test_state();

        let response = get_form_page(State(state), Path(999)).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn receipts_panel_shows_images() {
        let (state, form_id, _) = get_test_state();

        let response = get_form_receipts(State(state), Path(form_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let image = html
            .select(&Selector::parse("img").unwrap())
            .next()
            .expect("No receipt image");
        assert_eq!(
            image.value().attr("src"),
            Some("data:image/png;base64,aGVsbG8gd29ybGQgaGVsbG8=")
        );
    }
}
