use serde::Deserialize;
use std::path::Path;

use super::BulkSendError;

#[derive(Deserialize)]
struct RecipientRecord {
    email: String,
}

/// Reads the `email` column of a CSV file with a header row. Other columns are ignored, and so
/// are blank lines and records without an address.
pub fn read_recipient_list(path: &Path) -> Result<Vec<String>, BulkSendError> {
    let list_error = |source: csv::Error| BulkSendError::ListError {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(list_error)?;

    let mut emails = Vec::new();

    for record in reader.deserialize::<RecipientRecord>() {
        let record = record.map_err(list_error)?;

        if !record.email.is_empty() {
            emails.push(record.email);
        }
    }

    Ok(emails)
}

/// Explicit recipients first, then the ones from the list, in file order. Repeated addresses
/// are kept.
pub fn collect_recipients(
    to: &[String],
    list: Option<&Path>,
) -> Result<Vec<String>, BulkSendError> {
    let mut recipients = to.to_vec();

    if let Some(list) = list {
        recipients.extend(read_recipient_list(list)?);
    }

    Ok(recipients)
}
