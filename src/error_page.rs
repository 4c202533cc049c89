//! Full pages for requests that cannot be served: 404 and 500.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// The fallback route handler.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// A 404 page, for handlers that find the route but not the form.
pub fn get_404_not_found_response() -> Response {
    let page = error_view(
        "Not Found",
        "404",
        "Something's missing.",
        "Sorry, we can't find that page or form. You'll find lots to explore on the dashboard.",
    );

    (StatusCode::NOT_FOUND, Html(page.into_string())).into_response()
}

/// A 500 page. `fix` tells the reader what they can do about it, if anything.
pub fn get_500_internal_server_error_response(fix: Option<&str>) -> Response {
    let page = error_view(
        "Internal Server Error",
        "500",
        "Sorry, something went wrong.",
        fix.unwrap_or("Try again later or check the server logs"),
    );

    (StatusCode::INTERNAL_SERVER_ERROR, Html(page.into_string())).into_response()
}
