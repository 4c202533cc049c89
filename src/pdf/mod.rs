//! Exporting forms as PDF documents.

mod endpoint;
mod generator;
mod merge;

#[cfg(test)]
mod test_utils;

pub use endpoint::get_form_pdf;
