//! Application router configuration. Every route requires a signed in user.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{delete, get, post},
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    AppState,
    auth::{auth_guard, auth_guard_api, auth_guard_hx, get_current_identity},
    dashboard::get_dashboard_page,
    endpoints,
    error_page::get_404_not_found,
    form::{
        create_form_api, create_form_endpoint, delete_form_api, delete_form_endpoint,
        get_create_form_page, get_edit_form_page, get_form_api, get_form_page, get_form_receipts,
        get_transaction_row, list_forms_api, update_form_api, update_form_endpoint,
    },
    logging::logging_middleware,
    pdf::get_form_pdf,
    receipt::{delete_receipt_api, delete_receipt_endpoint},
};

/// The largest request body accepted, enough for a form with a few photos of receipts.
pub(crate) const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::NEW_FORM_VIEW, get(get_create_form_page))
        .route(endpoints::TRANSACTION_ROW, get(get_transaction_row))
        .route(endpoints::FORM_VIEW, get(get_form_page))
        .route(endpoints::FORM_RECEIPTS_VIEW, get(get_form_receipts))
        .route(endpoints::EDIT_FORM_VIEW, get(get_edit_form_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for
    // HTMX requests.
    let htmx_routes = Router::new()
        .route(endpoints::FORMS, post(create_form_endpoint))
        .route(
            endpoints::FORM_VIEW,
            delete(delete_form_endpoint).put(update_form_endpoint),
        )
        .route(endpoints::FORM_RECEIPT, delete(delete_receipt_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    let api_routes = Router::new()
        .route(
            endpoints::FORMS_API,
            get(list_forms_api).post(create_form_api),
        )
        .route(
            endpoints::FORM_API,
            get(get_form_api)
                .put(update_form_api)
                .delete(delete_form_api),
        )
        .route(endpoints::FORM_RECEIPT_API, delete(delete_receipt_api))
        .route(endpoints::FORM_PDF, get(get_form_pdf))
        .route(endpoints::ME_API, get(get_current_identity))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_api));

    page_routes
        .merge(htmx_routes)
        .merge(api_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        // Outermost, so oversized bodies are refused before the logger buffers them.
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
