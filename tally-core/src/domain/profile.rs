//! Import profile domain model
//!
//! A profile is data, not code: it names the source format, which source
//! field feeds each canonical transaction field, and the date/sign
//! conventions of one bank export.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Declared format of a statement file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Ofx,
    Qif,
}

impl SourceFormat {
    /// Detect the format from a file name extension, falling back to content sniffing
    pub fn detect(file_name: Option<&str>, text: &str) -> Self {
        if let Some(ext) = file_name
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
        {
            match ext.as_str() {
                "ofx" | "qfx" => return Self::Ofx,
                "qif" => return Self::Qif,
                "csv" | "txt" | "tsv" => return Self::Csv,
                _ => {}
            }
        }

        let head = text.trim_start_matches('\u{feff}').trim_start();
        let upper: String = head.chars().take(512).collect::<String>().to_uppercase();
        if upper.starts_with("OFXHEADER") || upper.contains("<OFX>") {
            Self::Ofx
        } else if upper.starts_with("!TYPE:") || upper.starts_with("!OPTION") || upper.starts_with("!ACCOUNT") {
            Self::Qif
        } else {
            Self::Csv
        }
    }

    /// Day/month ordering fixed by the format itself
    ///
    /// QIF writers emit US month-first dates; CSV carries no convention and
    /// OFX dates are `YYYYMMDD`.
    pub fn conventional_date_order(&self) -> Option<DayMonthOrder> {
        match self {
            Self::Qif => Some(DayMonthOrder::MonthFirst),
            Self::Csv | Self::Ofx => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "CSV"),
            Self::Ofx => write!(f, "OFX"),
            Self::Qif => write!(f, "QIF"),
        }
    }
}

impl FromStr for SourceFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "ofx" | "qfx" => Ok(Self::Ofx),
            "qif" => Ok(Self::Qif),
            other => Err(Error::validation(format!("Unknown source format: {}", other))),
        }
    }
}

/// Fields of the canonical transaction shape a profile can map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Date,
    Amount,
    Debit,
    Credit,
    /// Credit/debit indicator for unsigned amounts
    Direction,
    Description,
    Category,
    Notes,
    Tags,
    /// Running balance column, if the bank exports one
    Balance,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Direction => "direction",
            Self::Description => "description",
            Self::Category => "category",
            Self::Notes => "notes",
            Self::Tags => "tags",
            Self::Balance => "balance",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a canonical field comes from in a raw record
///
/// Serialized untagged: a string names a column, a number is a zero-based
/// position, an array is a fallback chain (first present wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelector {
    Index(usize),
    Name(String),
    FirstOf(Vec<FieldSelector>),
}

impl FieldSelector {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn first_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FirstOf(names.into_iter().map(|n| Self::Name(n.into())).collect())
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "column #{}", i),
            Self::Name(n) => write!(f, "column '{}'", n),
            Self::FirstOf(list) => {
                let parts: Vec<String> = list.iter().map(|s| s.to_string()).collect();
                write!(f, "first of [{}]", parts.join(", "))
            }
        }
    }
}

/// How the sign of an amount is expressed in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountSignConvention {
    /// Amount column already carries the sign (outflows negative)
    #[default]
    Signed,
    /// Outflows are positive, e.g. credit card statements
    Inverted,
    /// Separate debit and credit columns, both unsigned
    DebitCredit,
    /// Unsigned amount plus a separate credit/debit indicator field
    DirectionColumn,
}

impl FromStr for AmountSignConvention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "signed" => Ok(Self::Signed),
            "inverted" | "flip" | "flipsigns" => Ok(Self::Inverted),
            "debitcredit" => Ok(Self::DebitCredit),
            "direction" | "directioncolumn" | "typecolumn" => Ok(Self::DirectionColumn),
            other => Err(Error::validation(format!("Unknown sign convention: {}", other))),
        }
    }
}

/// Ordering of day and month in slash/dash separated dates
///
/// `01/02/2024` is the 1st of February day-first and the 2nd of January
/// month-first. Nothing in the text itself can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DayMonthOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

impl DayMonthOrder {
    /// Infer the ordering from an explicit format hint such as `MM/DD/YYYY`
    pub fn from_hint(hint: &str) -> Option<Self> {
        let upper = hint.trim().to_uppercase();
        let day = upper.find('D')?;
        let month = upper.find("MM")?;
        if upper.starts_with("YYYY") {
            return None;
        }
        Some(if month < day { Self::MonthFirst } else { Self::DayFirst })
    }
}

impl FromStr for DayMonthOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "dayfirst" | "dmy" => Ok(Self::DayFirst),
            "monthfirst" | "mdy" => Ok(Self::MonthFirst),
            other => Err(Error::validation(format!("Unknown date order: {}", other))),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A saved field mapping plus format and sign conventions for one source type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProfile {
    pub id: Uuid,
    pub name: String,
    pub source_format: SourceFormat,
    pub field_mapping: BTreeMap<CanonicalField, FieldSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_order: Option<DayMonthOrder>,
    #[serde(default)]
    pub amount_sign_convention: AmountSignConvention,
    /// Catalog entry this profile was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_key: Option<String>,
    /// CSV delimiter; sniffed from the header line when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    #[serde(default = "default_true")]
    pub has_header: bool,
    /// Preamble lines before the CSV header
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub default_tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportProfile {
    /// Create a profile with the default mapping for its format
    pub fn new(name: impl Into<String>, source_format: SourceFormat) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_format,
            field_mapping: Self::default_mapping(source_format),
            date_format_hint: None,
            date_order: None,
            amount_sign_convention: AmountSignConvention::Signed,
            bank_key: None,
            delimiter: None,
            has_header: true,
            skip_rows: 0,
            default_tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Default mapping per format
    ///
    /// OFX and QIF field names are the ones the parsers emit, so these
    /// mappings work for every OFX/QIF export.
    pub fn default_mapping(format: SourceFormat) -> BTreeMap<CanonicalField, FieldSelector> {
        let mut mapping = BTreeMap::new();
        match format {
            SourceFormat::Csv => {
                mapping.insert(CanonicalField::Date, FieldSelector::name("Date"));
                mapping.insert(CanonicalField::Amount, FieldSelector::name("Amount"));
                mapping.insert(CanonicalField::Description, FieldSelector::name("Description"));
            }
            SourceFormat::Ofx => {
                mapping.insert(CanonicalField::Date, FieldSelector::name("date"));
                mapping.insert(CanonicalField::Amount, FieldSelector::name("amount"));
                mapping.insert(CanonicalField::Description, FieldSelector::first_of(["name", "payee", "memo"]));
                mapping.insert(CanonicalField::Notes, FieldSelector::name("memo"));
                mapping.insert(CanonicalField::Direction, FieldSelector::name("type"));
            }
            SourceFormat::Qif => {
                mapping.insert(CanonicalField::Date, FieldSelector::name("date"));
                mapping.insert(CanonicalField::Amount, FieldSelector::name("amount"));
                mapping.insert(CanonicalField::Description, FieldSelector::first_of(["payee", "memo"]));
                mapping.insert(CanonicalField::Notes, FieldSelector::name("memo"));
                mapping.insert(CanonicalField::Category, FieldSelector::name("category"));
            }
        }
        mapping
    }

    /// Builder-style field assignment
    pub fn with_field(mut self, field: CanonicalField, selector: FieldSelector) -> Self {
        self.field_mapping.insert(field, selector);
        self
    }

    pub fn selector(&self, field: CanonicalField) -> Option<&FieldSelector> {
        self.field_mapping.get(&field)
    }

    /// Day/month ordering: explicit setting, then the hint, then the
    /// format's convention, then the caller's default
    pub fn effective_date_order(&self, default: DayMonthOrder) -> DayMonthOrder {
        self.date_order
            .or_else(|| self.date_format_hint.as_deref().and_then(DayMonthOrder::from_hint))
            .or_else(|| self.source_format.conventional_date_order())
            .unwrap_or(default)
    }

    /// Normalize the name used as the storage key
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_string()
    }

    /// Validate profile data
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("profile name cannot be empty"));
        }
        if self.selector(CanonicalField::Date).is_none() {
            return Err(Error::validation("profile must map a date field"));
        }

        let has_amount = self.selector(CanonicalField::Amount).is_some();
        let has_split = self.selector(CanonicalField::Debit).is_some()
            || self.selector(CanonicalField::Credit).is_some();

        match self.amount_sign_convention {
            AmountSignConvention::DebitCredit if !has_split => Err(Error::validation(
                "debitCredit convention requires a debit or credit field",
            )),
            AmountSignConvention::DirectionColumn
                if self.selector(CanonicalField::Direction).is_none() =>
            {
                Err(Error::validation(
                    "directionColumn convention requires a direction field",
                ))
            }
            _ if !has_amount && !has_split => {
                Err(Error::validation("profile must map an amount field"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_by_extension_and_content() {
        assert_eq!(SourceFormat::detect(Some("export.QFX"), ""), SourceFormat::Ofx);
        assert_eq!(SourceFormat::detect(Some("money.qif"), ""), SourceFormat::Qif);
        assert_eq!(SourceFormat::detect(None, "OFXHEADER:100\nDATA:OFXSGML"), SourceFormat::Ofx);
        assert_eq!(SourceFormat::detect(None, "!Type:Bank\nD01/02/2024\n^"), SourceFormat::Qif);
        assert_eq!(SourceFormat::detect(Some("statement"), "Date,Amount\n"), SourceFormat::Csv);
    }

    #[test]
    fn test_date_order_from_hint() {
        assert_eq!(DayMonthOrder::from_hint("MM/DD/YYYY"), Some(DayMonthOrder::MonthFirst));
        assert_eq!(DayMonthOrder::from_hint("dd.mm.yyyy"), Some(DayMonthOrder::DayFirst));
        assert_eq!(DayMonthOrder::from_hint("YYYY-MM-DD"), None);
    }

    #[test]
    fn test_selector_serde_shapes() {
        let json = r#"{"date": "Posted", "amount": 3, "description": ["Payee", "Memo"]}"#;
        let mapping: BTreeMap<CanonicalField, FieldSelector> = serde_json::from_str(json).unwrap();
        assert_eq!(mapping[&CanonicalField::Date], FieldSelector::name("Posted"));
        assert_eq!(mapping[&CanonicalField::Amount], FieldSelector::Index(3));
        assert_eq!(
            mapping[&CanonicalField::Description],
            FieldSelector::first_of(["Payee", "Memo"])
        );
    }

    #[test]
    fn test_profile_validation() {
        let profile = ImportProfile::new("Checking", SourceFormat::Csv);
        assert!(profile.validate().is_ok());

        let mut no_date = profile.clone();
        no_date.field_mapping.remove(&CanonicalField::Date);
        assert!(no_date.validate().is_err());

        let mut split = profile.clone();
        split.amount_sign_convention = AmountSignConvention::DebitCredit;
        assert!(split.validate().is_err());
        let split = split.with_field(CanonicalField::Debit, FieldSelector::name("Debit"));
        assert!(split.validate().is_ok());

        let mut direction = profile;
        direction.amount_sign_convention = AmountSignConvention::DirectionColumn;
        assert!(direction.validate().is_err());
    }

    #[test]
    fn test_effective_date_order() {
        let mut profile = ImportProfile::new("US bank", SourceFormat::Csv);
        assert_eq!(profile.effective_date_order(DayMonthOrder::DayFirst), DayMonthOrder::DayFirst);

        profile.date_format_hint = Some("MM/DD/YYYY".to_string());
        assert_eq!(profile.effective_date_order(DayMonthOrder::DayFirst), DayMonthOrder::MonthFirst);

        profile.date_order = Some(DayMonthOrder::DayFirst);
        assert_eq!(profile.effective_date_order(DayMonthOrder::MonthFirst), DayMonthOrder::DayFirst);
    }

    #[test]
    fn test_qif_defaults_to_month_first() {
        let mut profile = ImportProfile::new("QIF", SourceFormat::Qif);
        assert_eq!(profile.effective_date_order(DayMonthOrder::DayFirst), DayMonthOrder::MonthFirst);

        profile.date_format_hint = Some("DD/MM/YYYY".to_string());
        assert_eq!(profile.effective_date_order(DayMonthOrder::MonthFirst), DayMonthOrder::DayFirst);

        let ofx = ImportProfile::new("OFX", SourceFormat::Ofx);
        assert_eq!(ofx.effective_date_order(DayMonthOrder::DayFirst), DayMonthOrder::DayFirst);
    }
}
