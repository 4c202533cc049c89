//! Reading the multipart forms posted by the new and edit form pages.
//!
//! Each transaction's inputs are named `transactions[<row>].<field>`, where `<row>` is any
//! number unique to the row on the page. Files are read from `transactions[<row>].files` and
//! encoded as base64 data URLs, so the rest of the app only sees
//! `{name, type, base64Content}` triples.

use std::collections::BTreeMap;

use axum::extract::{Multipart, multipart::Field};
use rusqlite::Connection;

use crate::{
    Error,
    database_id::TransactionId,
    form::{
        core::DEFAULT_FORM_TYPE,
        submission::{
            FormFieldsRequest, NewFormRequest, ReceiptFileRequest, TransactionKey,
            TransactionRequest, UpdateFormRequest,
        },
    },
    receipt::{MAX_RECEIPTS_PER_TRANSACTION, count_receipts_for_transaction, to_data_url},
    validation::FieldError,
};

/// The inputs of one transaction fieldset.
#[derive(Debug, Default)]
struct TransactionRow {
    id: Option<String>,
    date: String,
    account_line: String,
    department: String,
    place_vendor: String,
    description: String,
    amount: String,
    remove: bool,
    files: Vec<ReceiptFileRequest>,
}

/// The raw contents of a posted form page.
#[derive(Debug, Default)]
pub struct FormMultipart {
    form_type: Option<String>,
    reimbursed_name: String,
    reimbursed_email: String,
    rows: BTreeMap<u32, TransactionRow>,
}

/// Split `transactions[3].amount` into `(3, "amount")`.
fn parse_transaction_field_name(name: &str) -> Option<(u32, &str)> {
    let rest = name.strip_prefix("transactions[")?;
    let (row, field) = rest.split_once("].")?;

    Some((row.parse().ok()?, field))
}

async fn read_text(field: Field<'_>) -> Result<String, Error> {
    field.text().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError("Could not read data from multipart form field.".to_owned())
    })
}

/// Read an uploaded file, or `None` if the file input was left empty.
async fn read_file(field: Field<'_>) -> Result<Option<ReceiptFileRequest>, Error> {
    let name = field.file_name().unwrap_or_default().to_owned();
    let file_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();

    let bytes = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read file from multipart form field: {error}");
        Error::MultipartError("Could not read file from multipart form field.".to_owned())
    })?;

    // Browsers send an empty part for a file input with no file selected.
    if name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }

    tracing::debug!("Received file '{name}' ({file_type}) that is {} bytes", bytes.len());

    Ok(Some(ReceiptFileRequest {
        base64_content: to_data_url(&file_type, &bytes),
        name,
        file_type,
    }))
}

/// Read every field of a posted form page.
///
/// # Errors
/// Returns [Error::MultipartError] if the body is not a valid multipart form.
pub async fn read_form_multipart(mut multipart: Multipart) -> Result<FormMultipart, Error> {
    let mut form = FormMultipart::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                tracing::error!("Could not parse multipart form: {error}");
                return Err(Error::MultipartError(error.body_text()));
            }
        };

        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            "form_type" => form.form_type = Some(read_text(field).await?),
            "reimbursed_name" => form.reimbursed_name = read_text(field).await?,
            "reimbursed_email" => form.reimbursed_email = read_text(field).await?,
            _ => {
                let Some((row_key, row_field)) = parse_transaction_field_name(&name) else {
                    tracing::debug!("Ignoring unknown multipart field {name:?}");
                    continue;
                };
                let row_field = row_field.to_owned();

                if row_field == "files" {
                    let file = read_file(field).await?;
                    let row = form.rows.entry(row_key).or_default();
                    row.files.extend(file);
                    continue;
                }

                let value = read_text(field).await?;
                let row = form.rows.entry(row_key).or_default();

                match row_field.as_str() {
                    "id" => row.id = Some(value),
                    "date" => row.date = value,
                    "account_line" => row.account_line = value,
                    "department" => row.department = value,
                    "place_vendor" => row.place_vendor = value,
                    "description" => row.description = value,
                    "amount" => row.amount = value,
                    "remove" => row.remove = true,
                    _ => tracing::debug!("Ignoring unknown transaction field {name:?}"),
                }
            }
        }
    }

    Ok(form)
}

struct SplitForm {
    form_fields: FormFieldsRequest,
    transactions: Vec<TransactionRequest>,
    deleted_transaction_ids: Vec<TransactionId>,
}

impl FormMultipart {
    /// Convert the rows into transaction requests, setting aside the rows marked for removal.
    fn split(self) -> Result<SplitForm, Error> {
        let mut transactions = Vec::with_capacity(self.rows.len());
        let mut deleted_transaction_ids = Vec::new();
        let mut field_errors = Vec::new();

        for row in self.rows.into_values() {
            let id = match row.id.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(id) => match id.parse::<TransactionId>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        field_errors.push(FieldError::new(
                            format!("transactions[{}].id", transactions.len()),
                            "Invalid transaction ID",
                        ));
                        None
                    }
                },
            };

            if row.remove {
                // Rows that were never saved have nothing to delete.
                if let TransactionKey::Existing(id) = TransactionKey::from_client_id(id) {
                    deleted_transaction_ids.push(id);
                }
                continue;
            }

            let amount = match row.amount.trim().parse::<f64>() {
                Ok(amount) if amount.is_finite() => amount,
                _ => {
                    field_errors.push(FieldError::new(
                        format!("transactions[{}].amount", transactions.len()),
                        "Amount must be a number",
                    ));
                    0.0
                }
            };

            transactions.push(TransactionRequest {
                id,
                date: row.date,
                account_line: row.account_line,
                department: row.department,
                place_vendor: row.place_vendor,
                description: row.description,
                amount,
                new_files: row.files,
            });
        }

        if !field_errors.is_empty() {
            return Err(Error::Validation(field_errors));
        }

        Ok(SplitForm {
            form_fields: FormFieldsRequest {
                form_type: self
                    .form_type
                    .filter(|form_type| !form_type.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FORM_TYPE.to_owned()),
                reimbursed_name: self.reimbursed_name,
                reimbursed_email: self.reimbursed_email,
            },
            transactions,
            deleted_transaction_ids,
        })
    }

    /// Convert the posted new form page into a [NewFormRequest].
    pub fn into_new_form_request(self) -> Result<NewFormRequest, Error> {
        let split = self.split()?;

        Ok(NewFormRequest {
            form_fields: split.form_fields,
            transactions: split.transactions,
        })
    }

    /// Convert the posted edit page into an [UpdateFormRequest].
    pub fn into_update_form_request(self) -> Result<UpdateFormRequest, Error> {
        let split = self.split()?;

        Ok(UpdateFormRequest {
            form_id: None,
            form_fields: split.form_fields,
            transactions: split.transactions,
            deleted_transaction_ids: split.deleted_transaction_ids,
        })
    }
}

/// Reject transactions that would end up with more than [MAX_RECEIPTS_PER_TRANSACTION]
/// receipts, counting the receipts already stored for existing transactions.
///
/// # Errors
/// Returns [Error::Validation] with an error for each transaction over the limit.
pub fn check_receipt_limit(
    transactions: &[TransactionRequest],
    connection: &Connection,
) -> Result<(), Error> {
    let mut field_errors = Vec::new();

    for (index, transaction) in transactions.iter().enumerate() {
        if transaction.new_files.is_empty() {
            continue;
        }

        let stored = match TransactionKey::from_client_id(transaction.id) {
            TransactionKey::Existing(id) => count_receipts_for_transaction(id, connection)?,
            TransactionKey::New => 0,
        };

        if stored + transaction.new_files.len() > MAX_RECEIPTS_PER_TRANSACTION {
            field_errors.push(FieldError::new(
                format!("transactions[{index}].newFiles"),
                format!(
                    "A transaction can have at most {MAX_RECEIPTS_PER_TRANSACTION} receipts \
                    ({stored} already attached)"
                ),
            ));
        }
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(field_errors))
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        form::{
            multipart::{check_receipt_limit, parse_transaction_field_name, read_form_multipart},
            submission::test_requests::{receipt_file_request, transaction_request},
            test_utils::{insert_test_form, insert_test_transaction},
        },
        receipt::{ReceiptFile, insert_receipt},
        test_utils::{MultipartPart, must_make_multipart},
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn parses_transaction_field_names() {
        assert_eq!(
            parse_transaction_field_name("transactions[12].place_vendor"),
            Some((12, "place_vendor"))
        );
        assert_eq!(parse_transaction_field_name("transactions[x].amount"), None);
        assert_eq!(parse_transaction_field_name("reimbursed_name"), None);
    }

    #[tokio::test]
    async fn reads_rows_and_encodes_files() {
        let multipart = must_make_multipart(&[
            MultipartPart::text("reimbursed_name", "Alex Doe"),
            MultipartPart::text("reimbursed_email", "alex@example.com"),
            MultipartPart::text("transactions[5].date", "2025-02-01"),
            MultipartPart::text("transactions[5].account_line", "Missions"),
            MultipartPart::text("transactions[5].department", "Youth"),
            MultipartPart::text("transactions[5].place_vendor", "Costco"),
            MultipartPart::text("transactions[5].description", "Snacks"),
            MultipartPart::text("transactions[5].amount", "12.50"),
            MultipartPart::file("transactions[5].files", "snacks.png", "image/png", b"not really a png"),
            MultipartPart::file("transactions[5].files", "", "application/octet-stream", b""),
            MultipartPart::text("transactions[1].date", "2025-01-31"),
            MultipartPart::text("transactions[1].account_line", "General Fund"),
            MultipartPart::text("transactions[1].department", "Admin"),
            MultipartPart::text("transactions[1].place_vendor", "Staples"),
            MultipartPart::text("transactions[1].description", "Paper"),
            MultipartPart::text("transactions[1].amount", "3"),
        ])
        .await;

        let request = read_form_multipart(multipart)
            .await
            .unwrap()
            .into_new_form_request()
            .unwrap();

        assert_eq!(request.form_fields.form_type, "REIMBURSEMENT");
        assert_eq!(request.form_fields.reimbursed_name, "Alex Doe");
        assert_eq!(request.transactions.len(), 2);
        // Rows are ordered by their key on the page.
        assert_eq!(request.transactions[0].place_vendor, "Staples");
        assert_eq!(request.transactions[0].amount, 3.0);
        assert!(request.transactions[0].new_files.is_empty());
        let files = &request.transactions[1].new_files;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "snacks.png");
        assert_eq!(files[0].file_type, "image/png");
        assert!(files[0].base64_content.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn removed_rows_become_deleted_ids() {
        let multipart = must_make_multipart(&[
            MultipartPart::text("reimbursed_name", "Alex Doe"),
            MultipartPart::text("reimbursed_email", "alex@example.com"),
            MultipartPart::text("transactions[0].id", "7"),
            MultipartPart::text("transactions[0].remove", "on"),
            MultipartPart::text("transactions[1].id", "8"),
            MultipartPart::text("transactions[1].date", "2025-01-31"),
            MultipartPart::text("transactions[1].account_line", "General Fund"),
            MultipartPart::text("transactions[1].department", "Admin"),
            MultipartPart::text("transactions[1].place_vendor", "Staples"),
            MultipartPart::text("transactions[1].description", "Paper"),
            MultipartPart::text("transactions[1].amount", "3"),
            MultipartPart::text("transactions[2].remove", "on"),
        ])
        .await;

        let request = read_form_multipart(multipart)
            .await
            .unwrap()
            .into_update_form_request()
            .unwrap();

        assert_eq!(request.deleted_transaction_ids, vec![7]);
        assert_eq!(request.transactions.len(), 1);
        assert_eq!(request.transactions[0].id, Some(8));
    }

    #[tokio::test]
    async fn unparseable_amount_is_a_field_error() {
        for amount in ["twelve", "NaN", "inf", "-infinity"] {
            let multipart =
                must_make_multipart(&[MultipartPart::text("transactions[0].amount", amount)])
                    .await;

            let result = read_form_multipart(multipart)
                .await
                .unwrap()
                .into_new_form_request();

            let Err(Error::Validation(errors)) = result else {
                panic!("want validation error for {amount:?}, got {result:?}");
            };
            assert_eq!(errors[0].field, "transactions[0].amount");
        }
    }

    #[test]
    fn new_transaction_may_have_two_files() {
        let connection = get_test_connection();
        let mut transaction = transaction_request(None);
        transaction.new_files = vec![receipt_file_request("a.png"), receipt_file_request("b.png")];

        assert_eq!(check_receipt_limit(&[transaction], &connection), Ok(()));
    }

    #[test]
    fn counts_stored_receipts_against_the_limit() {
        let connection = get_test_connection();
        let form_id = insert_test_form(&connection);
        let transaction_id = insert_test_transaction(form_id, &connection);
        let stored = ReceiptFile {
            name: "stored.png".to_owned(),
            file_type: "image/png".to_owned(),
            base64_content: "aGVsbG8gd29ybGQgaGVsbG8=".to_owned(),
        };
        insert_receipt(transaction_id, &stored, &connection).unwrap();
        let mut transaction = transaction_request(Some(transaction_id));
        transaction.new_files = vec![receipt_file_request("a.png"), receipt_file_request("b.png")];

        let result = check_receipt_limit(&[transaction], &connection);

        let Err(Error::Validation(errors)) = result else {
            panic!("want validation error, got {result:?}");
        };
        assert_eq!(errors[0].field, "transactions[0].newFiles");
    }
}
