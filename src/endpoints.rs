//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/forms/{form_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for signed in users, listing all forms.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for filling in a new form.
pub const NEW_FORM_VIEW: &str = "/forms/new";
/// An empty transaction fieldset for the new and edit form pages.
pub const TRANSACTION_ROW: &str = "/forms/transaction_row";
/// The route to submit a new form from the HTML page.
pub const FORMS: &str = "/forms";
/// The read-only page for a form. Also takes `PUT` and `DELETE` from the HTML pages.
pub const FORM_VIEW: &str = "/forms/{form_id}";
/// The lazily loaded receipts panel of a form.
pub const FORM_RECEIPTS_VIEW: &str = "/forms/{form_id}/receipts";
/// The page for editing a form.
pub const EDIT_FORM_VIEW: &str = "/forms/{form_id}/edit";
/// The route to delete a receipt from the HTML pages.
pub const FORM_RECEIPT: &str = "/forms/{form_id}/receipts/{receipt_id}";

/// The route to list and create forms.
pub const FORMS_API: &str = "/api/forms";
/// The route to get, update and delete a form.
pub const FORM_API: &str = "/api/forms/{form_id}";
/// The route to delete a receipt.
pub const FORM_RECEIPT_API: &str = "/api/forms/{form_id}/receipts/{receipt_id}";
/// The route to download a form as a PDF.
pub const FORM_PDF: &str = "/api/forms/{form_id}/pdf";
/// The route for the signed in user's identity.
pub const ME_API: &str = "/api/me";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/forms/{form_id}', '{form_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters.
/// Only the first parameter is replaced, so call it once per parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

/// Replace the two parameters in `endpoint_path` with `first` and `second`, in order.
pub fn format_endpoint_2(endpoint_path: &str, first: i64, second: i64) -> String {
    format_endpoint(&format_endpoint(endpoint_path, first), second)
}
