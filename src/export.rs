use std::path::Path;

use crate::{errors::OutputError, store::PersistedRow};

/// Writes every persisted row, header first, as CSV.
pub fn export_csv(rows: &[PersistedRow], path: impl AsRef<Path>) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

// serde writes the header from the first row; an empty table still gets one.
const HEADER: [&str; 13] = [
    "id",
    "bank_name",
    "product_name",
    "rate",
    "currency",
    "date_scraped",
    "source_url",
    "nettokreditbetrag",
    "gesamtbetrag",
    "vertragslaufzeit",
    "effektiver_jahreszins",
    "monatliche_rate",
    "full_text",
];
