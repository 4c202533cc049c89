//! Alert system for displaying success and error messages to users.
//!
//! Alerts are returned by HTMX endpoints. The rendered alert replaces the page's
//! `#alert-container` with an out-of-band swap, so it works whatever the request's target is.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// An alert message with appropriate styling.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with a line of details under it.
    Success { message: String, details: String },
    SuccessSimple { message: String },
    /// An error message with a line of details, e.g. the invalid fields.
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

impl Alert {
    /// Render the alert as an out-of-band swap for `#alert-container`.
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, Some(details)),
            Alert::SuccessSimple { message } => (false, message, None),
            Alert::Error { message, details } => (true, message, Some(details)),
            Alert::ErrorSimple { message } => (true, message, None),
        };

        let style = if is_error {
            "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 \
            dark:text-red-400 border border-red-300 dark:border-red-800 shadow"
        } else {
            "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 dark:bg-gray-800 \
            dark:text-green-400 border border-green-300 dark:border-green-800 shadow"
        };

        html!(
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    role="alert"
                    class=(style)
                    data-alert-kind=(if is_error { "error" } else { "success" })
                {
                    div class="flex items-start justify-between gap-4"
                    {
                        div
                        {
                            p class="font-medium" { (message) }

                            @if let Some(details) = details.filter(|details| !details.is_empty()) {
                                p class="mt-1" { (details) }
                            }
                        }

                        button
                            type="button"
                            aria-label="Dismiss"
                            class="font-bold"
                            onclick="this.closest('[role=alert]').remove()"
                        {
                            "×"
                        }
                    }
                }
            }
        )
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Html(self.into_html().into_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use scraper::{Html, Selector};

    use crate::{
        alert::Alert,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    #[tokio::test]
    async fn success_alert_has_message_and_out_of_band_swap() {
        let response = Alert::SuccessSimple {
            message: "Receipt deleted".to_owned(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert_alert(&html, "success", "Receipt deleted", None);
    }

    #[tokio::test]
    async fn error_alert_shows_details() {
        let response = Alert::Error {
            message: "Could not delete receipt".to_owned(),
            details: "Unauthorized access".to_owned(),
        }
        .into_response();

        let html = parse_html_fragment(response).await;
        assert_alert(
            &html,
            "error",
            "Could not delete receipt",
            Some("Unauthorized access"),
        );
    }

    #[track_caller]
    fn assert_alert(html: &Html, kind: &str, message: &str, details: Option<&str>) {
        let container = html
            .select(&Selector::parse("#alert-container").unwrap())
            .next()
            .expect("No alert container found");
        assert_eq!(container.value().attr("hx-swap-oob"), Some("true"));

        let alert = container
            .select(&Selector::parse("[role=alert]").unwrap())
            .next()
            .expect("No alert found");
        assert_eq!(alert.value().attr("data-alert-kind"), Some(kind));

        let paragraphs: Vec<String> = alert
            .select(&Selector::parse("p").unwrap())
            .map(|p| p.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(paragraphs.first().map(String::as_str), Some(message));
        assert_eq!(paragraphs.get(1).map(String::as_str), details);
    }
}
