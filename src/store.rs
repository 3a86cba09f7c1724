use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::Serialize;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    errors::StoreError,
    record::{CanonicalField, ExtractionRecord, FieldValues},
    registry::CURRENCY,
};

// Fixed width so lexical order in SQL equals time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS interest_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bank_name TEXT NOT NULL,
    product_name TEXT,
    rate TEXT,
    currency TEXT,
    date_scraped TEXT NOT NULL,
    source_url TEXT,
    nettokreditbetrag TEXT,
    gesamtbetrag TEXT,
    vertragslaufzeit TEXT,
    effektiver_jahreszins TEXT,
    monatliche_rate TEXT,
    full_text TEXT
)
"#;

// Older databases declare vertragslaufzeit INTEGER, so it is read back as text.
const COLUMNS: &str = "id, bank_name, product_name, rate, currency, \
     CAST(date_scraped AS TEXT) AS date_scraped, source_url, nettokreditbetrag, gesamtbetrag, \
     CAST(vertragslaufzeit AS TEXT) AS vertragslaufzeit, effektiver_jahreszins, monatliche_rate, full_text";

// Accepted on read: timestamps written without fractional seconds or with a
// `T` separator.
const LEGACY_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// One row of `interest_rates`, exactly as persisted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PersistedRow {
    pub id: i64,
    pub bank_name: String,
    pub product_name: Option<String>,
    pub rate: Option<String>,
    pub currency: Option<String>,
    pub date_scraped: String,
    pub source_url: Option<String>,
    pub nettokreditbetrag: Option<String>,
    pub gesamtbetrag: Option<String>,
    pub vertragslaufzeit: Option<String>,
    pub effektiver_jahreszins: Option<String>,
    pub monatliche_rate: Option<String>,
    pub full_text: Option<String>,
}

impl TryFrom<PersistedRow> for ExtractionRecord {
    type Error = StoreError;

    fn try_from(row: PersistedRow) -> Result<Self, Self::Error> {
        let observed_at = parse_timestamp(&row.date_scraped)
            .ok_or_else(|| StoreError::BadTimestamp(row.date_scraped.clone()))?;
        let fields: FieldValues = [
            (CanonicalField::Sollzinssatz, row.rate),
            (CanonicalField::EffektiverJahreszins, row.effektiver_jahreszins),
            (CanonicalField::Nettokreditbetrag, row.nettokreditbetrag),
            (CanonicalField::Vertragslaufzeit, row.vertragslaufzeit),
            (CanonicalField::Gesamtbetrag, row.gesamtbetrag),
            (CanonicalField::MonatlicheRate, row.monatliche_rate),
        ]
        .into_iter()
        .collect();
        Ok(ExtractionRecord {
            bank_id: row.bank_name,
            product_name: row.product_name.unwrap_or_default(),
            observed_at,
            source_url: row.source_url.unwrap_or_default(),
            fields,
            raw_text: row.full_text.unwrap_or_default(),
        })
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    std::iter::once(TIMESTAMP_FORMAT)
        .chain(LEGACY_TIMESTAMP_FORMATS.iter().copied())
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Append-only store of extraction records.
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Opens (creating if missing) the database at `url` and ensures the
    /// table exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn append(&self, record: &ExtractionRecord) -> Result<i64, StoreError> {
        let fields = &record.fields;
        let result = sqlx::query(
            "INSERT INTO interest_rates (bank_name, product_name, rate, currency, date_scraped, source_url, \
             nettokreditbetrag, gesamtbetrag, vertragslaufzeit, effektiver_jahreszins, monatliche_rate, full_text) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.bank_id)
        .bind(&record.product_name)
        .bind(fields.get(CanonicalField::Sollzinssatz))
        .bind(CURRENCY)
        .bind(format_timestamp(record.observed_at))
        .bind(&record.source_url)
        .bind(fields.get(CanonicalField::Nettokreditbetrag))
        .bind(fields.get(CanonicalField::Gesamtbetrag))
        .bind(fields.get(CanonicalField::Vertragslaufzeit))
        .bind(fields.get(CanonicalField::EffektiverJahreszins))
        .bind(fields.get(CanonicalField::MonatlicheRate))
        .bind(&record.raw_text)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// The record with the greatest timestamp for every bank, ordered by
    /// bank name. Equal timestamps resolve to the row inserted last. A row
    /// whose timestamp cannot be read is logged and left out.
    pub async fn latest_per_bank(&self) -> Result<Vec<ExtractionRecord>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM interest_rates i \
             WHERE i.id = ( \
                 SELECT j.id FROM interest_rates j \
                 WHERE j.bank_name = i.bank_name \
                 ORDER BY j.date_scraped DESC, j.id DESC LIMIT 1 \
             ) \
             ORDER BY i.bank_name"
        );
        let rows = sqlx::query_as::<_, PersistedRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let (id, bank) = (row.id, row.bank_name.clone());
                ExtractionRecord::try_from(row)
                    .inspect_err(|e| warn!("{bank}: skipping row {id}: {e}"))
                    .ok()
            })
            .collect())
    }

    /// Every stored row in insertion order.
    pub async fn all_rows(&self) -> Result<Vec<PersistedRow>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM interest_rates ORDER BY id");
        Ok(sqlx::query_as::<_, PersistedRow>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
