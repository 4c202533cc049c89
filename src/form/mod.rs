//! Forms: reimbursement requests made of transactions with attached receipts.
//!
//! This module holds the storage and reconciliation logic for forms and the HTML and JSON
//! route handlers built on it.

mod api;
mod core;
mod create;
mod create_endpoint;
mod create_page;
mod delete;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod fields;
mod multipart;
mod read;
mod reconcile;
mod submission;
mod view_page;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::{create_form_api, get_form_api, list_forms_api, update_form_api};
pub use core::{Form, FormGraph, create_form_table, pdf_file_name};
pub use create_endpoint::create_form_endpoint;
pub use create_page::get_create_form_page;
pub use delete_endpoint::{delete_form_api, delete_form_endpoint};
pub use edit_endpoint::update_form_endpoint;
pub use edit_page::get_edit_form_page;
pub use fields::get_transaction_row;
pub use read::{get_form_graph, list_forms};
pub use view_page::{get_form_page, get_form_receipts};
