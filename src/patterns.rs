use std::collections::HashMap;

use regex::Regex;

use crate::{
    errors::ConfigError,
    record::CanonicalField,
    registry::ExtractionMode,
};

/// Placeholder replaced by the regex-escaped label inside a template.
const LABEL_SLOT: &str = "{label}";

// A number that starts and ends with a digit, so sentence punctuation is
// never swallowed ("10.000." -> "10.000").
const NUMBER: &str = r"\d(?:[\d.,]*\d)?";
// German thousands grouping with optional cents: 10.000 / 10.000,00
const GROUPED_AMOUNT: &str = r"\d{1,3}(?:\.\d{3})*(?:,\d{2})?";

#[derive(Debug, Clone)]
pub enum FieldPattern {
    /// A label plus ordered regex variants applied to flattened visible
    /// text. The first variant that matches wins; its first capture group is
    /// the value.
    LabeledText { label: String, templates: Vec<Regex> },
    /// A key (dotted for nested objects) looked up in a JSON object.
    JsonKey(String),
    /// The source does not publish this field.
    Absent,
}

impl FieldPattern {
    /// Spaces inside `label` match any whitespace run, so a label wrapped
    /// across lines still matches.
    pub fn labeled(label: &str, templates: &[impl AsRef<str>]) -> Result<Self, ConfigError> {
        let escaped = regex::escape(label).replace(' ', r"\s+");
        let templates = templates
            .iter()
            .map(|template| {
                Regex::new(&template.as_ref().replace(LABEL_SLOT, &escaped)).map_err(|source| {
                    ConfigError::InvalidTemplate {
                        label: label.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldPattern::LabeledText {
            label: label.to_string(),
            templates,
        })
    }

    pub fn json_key(key: &str) -> Self {
        FieldPattern::JsonKey(key.to_string())
    }

    /// Label, key or marker used to identify the pattern in logs.
    pub fn describe(&self) -> &str {
        match self {
            FieldPattern::LabeledText { label, .. } => label,
            FieldPattern::JsonKey(key) => key,
            FieldPattern::Absent => "<absent>",
        }
    }

    fn applies_to(&self, mode: ExtractionMode) -> bool {
        match self {
            FieldPattern::LabeledText { .. } => mode == ExtractionMode::RenderedPage,
            FieldPattern::JsonKey(_) => mode == ExtractionMode::JsonApi,
            FieldPattern::Absent => true,
        }
    }
}

/// Exactly one pattern per canonical field for one bank.
#[derive(Debug, Clone)]
pub struct BankPatterns {
    bank_id: String,
    patterns: Vec<FieldPattern>,
}

impl BankPatterns {
    /// Fails with `MissingPattern` if any canonical field is not covered.
    /// A field listed twice keeps its last pattern.
    pub fn from_fields(
        bank_id: &str,
        fields: impl IntoIterator<Item = (CanonicalField, FieldPattern)>,
    ) -> Result<Self, ConfigError> {
        let mut slots: [Option<FieldPattern>; 6] = Default::default();
        for (field, pattern) in fields {
            slots[field.index()] = Some(pattern);
        }
        let patterns = CanonicalField::ALL
            .into_iter()
            .zip(slots)
            .map(|(field, slot)| {
                slot.ok_or_else(|| ConfigError::MissingPattern {
                    bank: bank_id.to_string(),
                    field,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            bank_id: bank_id.to_string(),
            patterns,
        })
    }

    pub fn bank_id(&self) -> &str {
        &self.bank_id
    }

    pub fn get(&self, field: CanonicalField) -> &FieldPattern {
        &self.patterns[field.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &FieldPattern)> + '_ {
        CanonicalField::ALL.into_iter().zip(self.patterns.iter())
    }

    /// Rejects tables that pair a text pattern with JSON content or a JSON
    /// key with page text.
    pub fn check_mode(&self, mode: ExtractionMode) -> Result<(), ConfigError> {
        match self.iter().find(|(_, pattern)| !pattern.applies_to(mode)) {
            Some((field, _)) => Err(ConfigError::PatternModeMismatch {
                bank: self.bank_id.clone(),
                field,
                mode: mode.as_str(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    banks: HashMap<String, BankPatterns>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        let mut table = Self::new();
        table.insert(raiffeisen()?);
        table.insert(bawag()?);
        table.insert(bank99()?);
        table.insert(erste()?);
        Ok(table)
    }

    /// Adds or replaces a bank's patterns.
    pub fn insert(&mut self, patterns: BankPatterns) {
        self.banks.insert(patterns.bank_id.clone(), patterns);
    }

    pub fn patterns_for(&self, bank_id: &str) -> Result<&BankPatterns, ConfigError> {
        self.banks
            .get(bank_id)
            .ok_or_else(|| ConfigError::UnknownBank(bank_id.to_string()))
    }
}

fn amount_with_unit(label: &str) -> Result<FieldPattern, ConfigError> {
    FieldPattern::labeled(
        label,
        &[
            &format!(r"(?i){LABEL_SLOT}\s*:\s*({NUMBER}\s*(?:Euro|EUR|€))"),
            &format!(r"(?i){LABEL_SLOT}\s*:\s*((?:€|EUR)\s*{NUMBER})"),
        ],
    )
}

fn raiffeisen() -> Result<BankPatterns, ConfigError> {
    let percent = |label| {
        FieldPattern::labeled(label, &[&format!(r"(?i){LABEL_SLOT}\s*:\s*({NUMBER}\s*%)")])
    };
    BankPatterns::from_fields(
        "raiffeisen",
        [
            (CanonicalField::Sollzinssatz, percent("Sollzinssatz")?),
            (CanonicalField::EffektiverJahreszins, percent("effektiver Jahreszins")?),
            (CanonicalField::Nettokreditbetrag, amount_with_unit("Nettokreditbetrag")?),
            (
                CanonicalField::Vertragslaufzeit,
                FieldPattern::labeled(
                    "Vertragslaufzeit",
                    &[r"(?i){label}\s*:\s*(\d+\s*Monate)"],
                )?,
            ),
            (CanonicalField::Gesamtbetrag, amount_with_unit("Gesamtbetrag")?),
            (CanonicalField::MonatlicheRate, amount_with_unit("monatliche Rate")?),
        ],
    )
}

fn bawag() -> Result<BankPatterns, ConfigError> {
    let amount = |label| {
        FieldPattern::labeled(
            label,
            &[
                &format!(r"{LABEL_SLOT}\s*:?\s*({NUMBER})\s*(?:Euro|EUR|€)"),
                &format!(r"{LABEL_SLOT}\s*:?\s*(?:€|EUR)\s*({NUMBER})"),
            ],
        )
    };
    BankPatterns::from_fields(
        "bawag",
        [
            (
                CanonicalField::Sollzinssatz,
                FieldPattern::labeled(
                    "Nominalzinssatz in Höhe von",
                    &[
                        &format!(r"{LABEL_SLOT}\s*({NUMBER}\s?%)\s*variabel"),
                        &format!(r"{LABEL_SLOT}\s*({NUMBER}\s?%)"),
                    ],
                )?,
            ),
            (
                CanonicalField::EffektiverJahreszins,
                FieldPattern::labeled(
                    "Effektivzinssatz",
                    &[
                        &format!(r"{LABEL_SLOT}\s*(?:von\s*)?({NUMBER}\s?%)\s*p\.\s?a\."),
                        &format!(r"{LABEL_SLOT}\s*(?:von\s*)?({NUMBER}\s?%)"),
                    ],
                )?,
            ),
            (CanonicalField::Nettokreditbetrag, amount("Nettodarlehensbetrag von")?),
            (
                CanonicalField::Vertragslaufzeit,
                FieldPattern::labeled("Laufzeit von", &[r"{label}\s*(\d+)\s*Monate"])?,
            ),
            (CanonicalField::Gesamtbetrag, amount("Gesamtrückzahlung")?),
            (CanonicalField::MonatlicheRate, amount("Monatliche Rate")?),
        ],
    )
}

fn bank99() -> Result<BankPatterns, ConfigError> {
    let grouped = |label| {
        FieldPattern::labeled(
            label,
            &[
                &format!(r"{LABEL_SLOT}\s*(?:€|EUR)\s*({GROUPED_AMOUNT})"),
                &format!(r"{LABEL_SLOT}\s*({GROUPED_AMOUNT})\s*(?:€|EUR|Euro)"),
            ],
        )
    };
    BankPatterns::from_fields(
        "bank99",
        [
            (
                CanonicalField::Sollzinssatz,
                FieldPattern::labeled(
                    "Sollzinssatz",
                    &[
                        r"{label}\s*(?:von\s*)?([\d,]+)\s*%\s*p\.\s?a\.\s*fix",
                        r"{label}\s*(?:von\s*)?([\d,]+)\s*%",
                    ],
                )?,
            ),
            (
                CanonicalField::EffektiverJahreszins,
                FieldPattern::labeled(
                    "effektiver Jahreszins",
                    &[
                        r"{label}\s*(?:von\s*)?([\d,]+)\s*%\s*p\.\s?a\.",
                        r"{label}\s*(?:von\s*)?([\d,]+)\s*%",
                    ],
                )?,
            ),
            (CanonicalField::Nettokreditbetrag, grouped("Kreditbetrag von")?),
            (
                CanonicalField::Vertragslaufzeit,
                FieldPattern::labeled("Laufzeit von", &[r"{label}\s*(\d+)\s*Monate"])?,
            ),
            (CanonicalField::Gesamtbetrag, grouped("Gesamtbetrag von")?),
            (
                CanonicalField::MonatlicheRate,
                // The label trails the amount here.
                FieldPattern::labeled(
                    "pro Monat",
                    &[
                        &format!(r"(?:€|EUR)\s*({NUMBER})\s*{LABEL_SLOT}"),
                        &format!(r"({NUMBER})\s*(?:€|EUR|Euro)\s*{LABEL_SLOT}"),
                    ],
                )?,
            ),
        ],
    )
}

fn erste() -> Result<BankPatterns, ConfigError> {
    BankPatterns::from_fields(
        "erste",
        [
            (CanonicalField::Sollzinssatz, FieldPattern::json_key("interestRate")),
            (
                CanonicalField::EffektiverJahreszins,
                FieldPattern::json_key("effectiveInterestRate"),
            ),
            (CanonicalField::Nettokreditbetrag, FieldPattern::json_key("startAmount")),
            (CanonicalField::Vertragslaufzeit, FieldPattern::json_key("startDuration")),
            // The calculator API does not publish the total amount.
            (CanonicalField::Gesamtbetrag, FieldPattern::Absent),
            (CanonicalField::MonatlicheRate, FieldPattern::json_key("installment")),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_every_bank_and_field() {
        let table = PatternTable::builtin().unwrap();
        for bank in ["raiffeisen", "bawag", "bank99", "erste"] {
            let patterns = table.patterns_for(bank).unwrap();
            assert_eq!(patterns.bank_id(), bank);
            assert_eq!(patterns.iter().count(), 6);
        }
    }

    #[test]
    fn builtin_patterns_match_their_source_mode() {
        let table = PatternTable::builtin().unwrap();
        for bank in ["raiffeisen", "bawag", "bank99"] {
            table
                .patterns_for(bank)
                .unwrap()
                .check_mode(ExtractionMode::RenderedPage)
                .unwrap();
        }
        table
            .patterns_for("erste")
            .unwrap()
            .check_mode(ExtractionMode::JsonApi)
            .unwrap();
    }

    #[test]
    fn erste_total_amount_is_absent() {
        let table = PatternTable::builtin().unwrap();
        let erste = table.patterns_for("erste").unwrap();
        assert!(matches!(erste.get(CanonicalField::Gesamtbetrag), FieldPattern::Absent));
    }

    #[test]
    fn unknown_bank_is_a_config_error() {
        let table = PatternTable::builtin().unwrap();
        assert!(matches!(
            table.patterns_for("hypo"),
            Err(ConfigError::UnknownBank(_))
        ));
    }

    #[test]
    fn missing_field_is_rejected() {
        let result = BankPatterns::from_fields(
            "partial",
            [(CanonicalField::Sollzinssatz, FieldPattern::Absent)],
        );
        assert!(matches!(
            result,
            Err(ConfigError::MissingPattern { field: CanonicalField::EffektiverJahreszins, .. })
        ));
    }

    #[test]
    fn mode_mismatch_is_reported_with_field() {
        let table = PatternTable::builtin().unwrap();
        let err = table
            .patterns_for("erste")
            .unwrap()
            .check_mode(ExtractionMode::RenderedPage)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PatternModeMismatch { field: CanonicalField::Sollzinssatz, .. }
        ));
    }

    #[test]
    fn label_is_escaped_inside_template() {
        let pattern = FieldPattern::labeled("Zins (p.a.)", &[r"{label}\s*(\d+)"]).unwrap();
        let FieldPattern::LabeledText { templates, .. } = pattern else {
            panic!("expected labeled text");
        };
        assert!(templates[0].is_match("Zins (p.a.) 5"));
        assert!(!templates[0].is_match("Zins Xp.a.) 5"));
    }

    #[test]
    fn label_spaces_match_any_whitespace_run() {
        let pattern =
            FieldPattern::labeled("effektiver Jahreszins", &[r"(?i){label}\s*:\s*(\d+,\d+)"]).unwrap();
        let FieldPattern::LabeledText { templates, .. } = pattern else {
            panic!("expected a labeled pattern");
        };
        let captured = |text| templates[0].captures(text).map(|c| c[1].to_string());
        assert_eq!(captured("effektiver\nJahreszins: 4,12"), Some("4,12".to_string()));
        assert_eq!(captured("effektiver  Jahreszins: 4,12"), Some("4,12".to_string()));
        assert_eq!(captured("effektiverJahreszins: 4,12"), None);
    }

    #[test]
    fn broken_template_is_a_config_error() {
        let result = FieldPattern::labeled("Rate", &[r"{label}\s*(\d+"]);
        assert!(matches!(result, Err(ConfigError::InvalidTemplate { .. })));
    }

    #[test]
    fn table_entries_can_be_swapped() {
        let mut table = PatternTable::builtin().unwrap();
        let replacement = BankPatterns::from_fields(
            "erste",
            CanonicalField::ALL.map(|field| (field, FieldPattern::Absent)),
        )
        .unwrap();
        table.insert(replacement);
        let erste = table.patterns_for("erste").unwrap();
        assert!(erste.iter().all(|(_, p)| matches!(p, FieldPattern::Absent)));
    }
}
