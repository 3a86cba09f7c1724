use std::{fmt::Write as _, fs, path::Path};

use chrono::{DateTime, Utc};

use crate::{
    errors::OutputError,
    record::{CanonicalField, ExtractionRecord, latest_per_bank},
};

const TITLE: &str = "Austrian Banks Interest Rate Comparison";
const MISSING: &str = "n/a";

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; background-color: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background-color: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        h1 { color: #333; text-align: center; margin-bottom: 30px; }
        table { width: 100%; border-collapse: collapse; margin-bottom: 20px; }
        th, td { padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background-color: #f8f9fa; font-weight: bold; }
        tr:hover { background-color: #f5f5f5; }
        .timestamp { text-align: center; color: #666; font-size: 0.9em; margin-top: 20px; }
        .bank-name { font-weight: bold; color: #2c3e50; }
        .value { font-family: monospace; }
        .parameter-name { font-weight: bold; background-color: #f8f9fa; }
"#;

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn capitalize(bank_id: &str) -> String {
    let mut chars = bank_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Comparison page: one column per bank, one row per canonical field.
/// Only the newest record of each bank is shown.
pub fn render(records: &[ExtractionRecord], generated_at: DateTime<Utc>) -> String {
    let banks = latest_per_bank(records);

    let mut header = String::new();
    for record in &banks {
        let _ = write!(
            header,
            "<th class=\"bank-name\">{}</th>",
            escape_html(&capitalize(&record.bank_id))
        );
    }

    let mut rows = String::new();
    for field in CanonicalField::ALL {
        let _ = write!(
            rows,
            "\n                <tr>\n                    <td class=\"parameter-name\">{}</td>",
            field.display_label()
        );
        for record in &banks {
            let value = record.fields.get(field).unwrap_or(MISSING);
            let _ = write!(rows, "<td class=\"value\">{}</td>", escape_html(value));
        }
        rows.push_str("\n                </tr>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="de">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{TITLE}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div class="container">
        <h1>{TITLE}</h1>
        <table>
            <thead>
                <tr>
                    <th>Parameter</th>{header}
                </tr>
            </thead>
            <tbody>{rows}
            </tbody>
        </table>
        <div class="timestamp">
            Last updated: {updated}
        </div>
    </div>
</body>
</html>
"#,
        updated = generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

pub fn write_comparison(path: impl AsRef<Path>, html: &str) -> Result<(), OutputError> {
    fs::write(path, html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::record::FieldValues;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(bank: &str, secs: i64, rate: Option<&str>) -> ExtractionRecord {
        let mut fields = FieldValues::default();
        fields.set(CanonicalField::Sollzinssatz, rate.map(str::to_string));
        ExtractionRecord {
            bank_id: bank.to_string(),
            product_name: "Representative Example".to_string(),
            observed_at: at(secs),
            source_url: String::new(),
            fields,
            raw_text: String::new(),
        }
    }

    #[test]
    fn empty_input_renders_headers_only() {
        let html = render(&[], at(0));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<th>Parameter</th>"));
        assert!(!html.contains("bank-name\">"));
        assert!(!html.contains("class=\"value\""));
        for field in CanonicalField::ALL {
            assert!(html.contains(field.display_label()));
        }
        assert!(html.contains("Last updated: 1970-01-01 00:00:00 UTC"));
    }

    #[test]
    fn one_column_per_bank_with_latest_values() {
        let records = vec![
            record("erste", 10, Some("4,20%")),
            record("bawag", 10, Some("6,99%")),
            record("erste", 5, Some("3,00%")),
        ];
        let html = render(&records, at(20));
        assert_eq!(html.matches("class=\"bank-name\"").count(), 2);
        let bawag = html.find(">Bawag<").unwrap();
        let erste = html.find(">Erste<").unwrap();
        assert!(bawag < erste);
        assert!(html.contains("<td class=\"value\">4,20%</td>"));
        assert!(!html.contains("3,00%"));
        // every row has one value cell per bank
        assert_eq!(html.matches("class=\"value\"").count(), 12);
        assert!(html.contains(&format!("<td class=\"value\">{MISSING}</td>")));
    }

    #[test]
    fn values_are_escaped() {
        let html = render(&[record("x<y", 1, Some("<b>5 %</b>"))], at(1));
        assert!(html.contains("X&lt;y"));
        assert!(html.contains("&lt;b&gt;5 %&lt;/b&gt;"));
        assert!(!html.contains("<b>5 %</b>"));
    }

    #[test]
    fn page_is_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank_comparison.html");
        write_comparison(&path, &render(&[], at(0))).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(TITLE));
    }
}
