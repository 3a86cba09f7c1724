use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The six normalized loan-term attributes every record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Sollzinssatz,
    EffektiverJahreszins,
    Nettokreditbetrag,
    Vertragslaufzeit,
    Gesamtbetrag,
    MonatlicheRate,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Sollzinssatz,
        CanonicalField::EffektiverJahreszins,
        CanonicalField::Nettokreditbetrag,
        CanonicalField::Vertragslaufzeit,
        CanonicalField::Gesamtbetrag,
        CanonicalField::MonatlicheRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Sollzinssatz => "sollzinssatz",
            CanonicalField::EffektiverJahreszins => "effektiver_jahreszins",
            CanonicalField::Nettokreditbetrag => "nettokreditbetrag",
            CanonicalField::Vertragslaufzeit => "vertragslaufzeit",
            CanonicalField::Gesamtbetrag => "gesamtbetrag",
            CanonicalField::MonatlicheRate => "monatliche_rate",
        }
    }

    /// Row label used on the comparison page.
    pub fn display_label(self) -> &'static str {
        match self {
            CanonicalField::Sollzinssatz => "Sollzinssatz",
            CanonicalField::EffektiverJahreszins => "Effektiver Jahreszins",
            CanonicalField::Nettokreditbetrag => "Nettokreditbetrag",
            CanonicalField::Vertragslaufzeit => "Vertragslaufzeit",
            CanonicalField::Gesamtbetrag => "Gesamtbetrag",
            CanonicalField::MonatlicheRate => "Monatliche Rate",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One optional verbatim value per canonical field. Always holds all six
/// keys; a field that could not be extracted is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: [Option<String>; 6],
}

impl FieldValues {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    pub fn set(&mut self, field: CanonicalField, value: Option<String>) {
        self.values[field.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<&str>)> + '_ {
        CanonicalField::ALL
            .into_iter()
            .map(|field| (field, self.get(field)))
    }

    pub fn missing(&self) -> Vec<CanonicalField> {
        self.iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| field)
            .collect()
    }

    pub fn populated_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }
}

impl FromIterator<(CanonicalField, Option<String>)> for FieldValues {
    fn from_iter<T: IntoIterator<Item = (CanonicalField, Option<String>)>>(iter: T) -> Self {
        let mut values = FieldValues::default();
        for (field, value) in iter {
            values.set(field, value);
        }
        values
    }
}

/// One observation of a bank's representative example. Created once per
/// fetch attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRecord {
    pub bank_id: String,
    pub product_name: String,
    pub observed_at: DateTime<Utc>,
    pub source_url: String,
    pub fields: FieldValues,
    /// Full captured text or JSON body, kept for re-parsing.
    pub raw_text: String,
}

/// Keeps only the record with the greatest `observed_at` for every bank,
/// ordered by bank id. On equal timestamps the later entry in `records` wins.
pub fn latest_per_bank(records: &[ExtractionRecord]) -> Vec<&ExtractionRecord> {
    let mut latest: HashMap<&str, &ExtractionRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.bank_id.as_str())
            .and_modify(|current| {
                if record.observed_at >= current.observed_at {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    let mut latest: Vec<_> = latest.into_values().collect();
    latest.sort_by(|a, b| a.bank_id.cmp(&b.bank_id));
    latest
}
