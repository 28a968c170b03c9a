//! Bank catalog
//!
//! An immutable data table of known institutions and their default import
//! profiles. Adding a bank means adding an entry to `catalog/banks.json`
//! (or to an external catalog file named in config), never new parser code.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{
    AmountSignConvention, CanonicalField, DayMonthOrder, FieldSelector, ImportProfile, SourceFormat,
};

const BUILTIN_CATALOG: &str = include_str!("../../catalog/banks.json");

/// Institution type, used for discovery only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstitutionKind {
    Traditional,
    Digital,
    Investment,
    Crypto,
    Payment,
    Business,
}

impl InstitutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traditional => "traditional",
            Self::Digital => "digital",
            Self::Investment => "investment",
            Self::Crypto => "crypto",
            Self::Payment => "payment",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for InstitutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InstitutionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "traditional" => Ok(Self::Traditional),
            "digital" => Ok(Self::Digital),
            "investment" => Ok(Self::Investment),
            "crypto" => Ok(Self::Crypto),
            "payment" => Ok(Self::Payment),
            "business" => Ok(Self::Business),
            other => Err(Error::validation(format!("Unknown institution kind: {}", other))),
        }
    }
}

fn default_format() -> SourceFormat {
    SourceFormat::Csv
}

fn default_true() -> bool {
    true
}

/// The profile fields a catalog entry pre-fills
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTemplate {
    #[serde(default = "default_format")]
    pub source_format: SourceFormat,
    /// Empty means the format's default mapping
    #[serde(default)]
    pub field_mapping: BTreeMap<CanonicalField, FieldSelector>,
    #[serde(default)]
    pub date_format_hint: Option<String>,
    #[serde(default)]
    pub date_order: Option<DayMonthOrder>,
    #[serde(default)]
    pub amount_sign_convention: AmountSignConvention,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default = "default_true")]
    pub has_header: bool,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub default_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankEntry {
    pub key: String,
    pub name: String,
    pub region: String,
    pub kind: InstitutionKind,
    /// Headers that identify this bank's export when all are present
    #[serde(default)]
    pub header_signature: Vec<String>,
    pub profile: ProfileTemplate,
}

impl BankEntry {
    /// Build a fresh import profile from this entry's template
    pub fn to_profile(&self) -> ImportProfile {
        let template = &self.profile;
        let mut profile = ImportProfile::new(self.name.clone(), template.source_format);
        if !template.field_mapping.is_empty() {
            profile.field_mapping = template.field_mapping.clone();
        }
        profile.date_format_hint = template.date_format_hint.clone();
        profile.date_order = template.date_order;
        profile.amount_sign_convention = template.amount_sign_convention;
        profile.bank_key = Some(self.key.clone());
        profile.delimiter = template.delimiter;
        profile.has_header = template.has_header;
        profile.skip_rows = template.skip_rows;
        profile.default_tags = template.default_tags.clone();
        profile
    }

    fn matches_headers(&self, headers: &[String]) -> bool {
        !self.header_signature.is_empty()
            && self.header_signature.iter().all(|wanted| {
                headers
                    .iter()
                    .any(|h| h.trim().to_lowercase() == wanted.trim().to_lowercase())
            })
    }
}

/// Known institutions, keyed by bank key
#[derive(Debug, Clone)]
pub struct BankCatalog {
    entries: Vec<BankEntry>,
}

impl BankCatalog {
    /// The catalog embedded in the library
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<BankEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Built-in catalog plus an optional external file; external entries
    /// replace built-in ones with the same key
    pub fn load(external: Option<&Path>) -> Result<Self> {
        let mut catalog = Self::builtin()?;
        if let Some(path) = external {
            let extra = Self::from_path(path)?;
            tracing::debug!(path = %path.display(), entries = extra.entries.len(), "loaded external bank catalog");
            catalog.extend(extra);
        }
        Ok(catalog)
    }

    pub fn extend(&mut self, other: BankCatalog) {
        for entry in other.entries {
            match self.entries.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    pub fn list(&self) -> &[BankEntry] {
        &self.entries
    }

    /// Entries matching an optional region and kind
    pub fn filter(&self, region: Option<&str>, kind: Option<InstitutionKind>) -> Vec<&BankEntry> {
        self.entries
            .iter()
            .filter(|e| region.map_or(true, |r| e.region.eq_ignore_ascii_case(r.trim())))
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&BankEntry> {
        let key = key.trim();
        self.entries.iter().find(|e| e.key.eq_ignore_ascii_case(key))
    }

    pub fn profile_for(&self, key: &str) -> Result<ImportProfile> {
        self.get(key)
            .map(BankEntry::to_profile)
            .ok_or_else(|| Error::not_found(format!("Unknown bank: {}", key)))
    }

    /// The most specific entry whose whole header signature is present
    pub fn infer_from_headers(&self, headers: &[String]) -> Option<&BankEntry> {
        self.entries
            .iter()
            .filter(|e| e.matches_headers(headers))
            .max_by_key(|e| e.header_signature.len())
    }
}
