//! Statement format parsers
//!
//! Each backend turns source text into the same `RawRecord` shape at the
//! parser boundary, so nothing downstream branches on the source format.

mod delimited;
mod ofx;
mod qif;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::{ImportProfile, SourceFormat, SourceRowRef};

pub use delimited::{sniff_delimiter, CsvOptions};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One named or positional value of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Header or tag name; `None` for headerless CSV columns
    pub name: Option<String>,
    pub value: String,
}

/// Ordered fields of one source record plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based position among data records
    pub row: usize,
    pub line: Option<usize>,
    pub fields: Vec<RawField>,
}

impl RawRecord {
    pub fn new(row: usize, line: Option<usize>) -> Self {
        Self {
            row,
            line,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: Option<&str>, value: impl Into<String>) {
        self.fields.push(RawField {
            name: name.map(str::to_string),
            value: value.into(),
        });
    }

    /// Value of the first field whose name matches, ignoring case and padding
    pub fn get(&self, name: &str) -> Option<&str> {
        let wanted = name.trim();
        self.fields
            .iter()
            .find(|f| {
                f.name
                    .as_deref()
                    .map_or(false, |n| n.trim().eq_ignore_ascii_case(wanted))
            })
            .map(|f| f.value.as_str())
    }

    /// Value at a 0-based column position
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.value.as_str())
    }

    pub fn row_ref(&self) -> SourceRowRef {
        SourceRowRef::new(self.row, self.line)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Statement-level facts some formats carry alongside transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

impl StatementMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Output of one parser run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub format: SourceFormat,
    /// Header row for CSV, emitted field names for OFX/QIF
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
    pub metadata: StatementMetadata,
}

/// Source text plus whether it needed the Latin-1 fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub non_utf8: bool,
}

/// Decode raw file bytes: UTF-8 with the BOM stripped, else ISO-8859-1
pub fn decode_text(bytes: &[u8]) -> DecodedText {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => DecodedText {
            text: text.to_string(),
            non_utf8: false,
        },
        Err(_) => {
            tracing::debug!("source is not valid UTF-8, decoding as ISO-8859-1");
            DecodedText {
                // ISO-8859-1 maps each byte to the code point of the same value
                text: bytes.iter().map(|&b| char::from(b)).collect(),
                non_utf8: true,
            }
        }
    }
}

/// Parse decoded text with the backend the profile names
pub fn parse_statement(text: &str, profile: &ImportProfile) -> Result<ParsedStatement> {
    let parsed = match profile.source_format {
        SourceFormat::Csv => delimited::parse(text, &CsvOptions::from_profile(profile))?,
        SourceFormat::Ofx => ofx::parse(text)?,
        SourceFormat::Qif => qif::parse(text)?,
    };
    tracing::debug!(
        format = %parsed.format,
        records = parsed.records.len(),
        "parsed statement"
    );
    Ok(parsed)
}

/// Read only the header row (or emitted field names) of a statement
pub fn read_headers(text: &str, format: SourceFormat, options: &CsvOptions) -> Result<Vec<String>> {
    match format {
        SourceFormat::Csv => delimited::read_headers(text, options),
        SourceFormat::Ofx => Ok(ofx::FIELD_NAMES.iter().map(|s| s.to_string()).collect()),
        SourceFormat::Qif => Ok(qif::FIELD_NAMES.iter().map(|s| s.to_string()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_bom() {
        let decoded = decode_text(b"\xEF\xBB\xBFDate,Amount\n");
        assert_eq!(decoded.text, "Date,Amount\n");
        assert!(!decoded.non_utf8);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "Café" in ISO-8859-1
        let decoded = decode_text(b"Caf\xE9");
        assert_eq!(decoded.text, "Café");
        assert!(decoded.non_utf8);
    }

    #[test]
    fn test_record_lookup_ignores_case() {
        let mut record = RawRecord::new(1, Some(2));
        record.push(Some(" Transaction Date "), "2024-01-15");
        record.push(None, "12.00");

        assert_eq!(record.get("transaction date"), Some("2024-01-15"));
        assert_eq!(record.get_index(1), Some("12.00"));
        assert_eq!(record.get("amount"), None);
        assert_eq!(record.row_ref(), SourceRowRef::new(1, Some(2)));
    }

    #[test]
    fn test_dispatch_by_profile_format() {
        let profile = ImportProfile::new("qif", SourceFormat::Qif);
        let parsed = parse_statement("!Type:Bank\nD01/15/2024\nT-12.00\nPShop\n^\n", &profile).unwrap();
        assert_eq!(parsed.format, SourceFormat::Qif);
        assert_eq!(parsed.records.len(), 1);
    }
}
