//! Heuristic column detection
//!
//! Best-guess mapping from CSV header names, used when neither a saved
//! profile nor a catalog entry applies.

use serde::Serialize;

use crate::domain::{AmountSignConvention, CanonicalField, FieldSelector, ImportProfile, SourceFormat};

const DATE_PATTERNS: &[&str] = &[
    "date", "transaction date", "trans date", "txn date", "txndate", "posted", "post date", "dt",
    "timestamp", "data",
];
const DESC_PATTERNS: &[&str] = &[
    "description", "desc", "memo", "payee", "merchant", "details", "narration", "title",
    "descrição", "lançamento", "histórico",
];
const AMOUNT_PATTERNS: &[&str] = &["amount", "amt", "total", "transaction amount", "net", "valor"];
const DEBIT_PATTERNS: &[&str] = &["debit", "dr", "withdrawal", "withdrawals", "debit amount", "money out", "paid out"];
const CREDIT_PATTERNS: &[&str] = &["credit", "cr", "deposit", "deposits", "credit amount", "money in", "paid in"];
const DIRECTION_PATTERNS: &[&str] = &["transaction type", "dr/cr", "cr/dr", "credit/debit", "debit/credit", "direction"];
const CATEGORY_PATTERNS: &[&str] = &["category", "categoria"];
const BALANCE_PATTERNS: &[&str] = &["balance", "running bal", "saldo"];
const FALLBACK_DESC_PATTERNS: &[&str] = &["name", "ref", "reference", "type"];

/// Detected column names, one per canonical field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedColumns {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub description: Option<String>,
    pub debit: Option<String>,
    pub credit: Option<String>,
    pub direction: Option<String>,
    pub category: Option<String>,
    pub balance: Option<String>,
}

impl DetectedColumns {
    /// True when a date and some amount column were found
    pub fn is_usable(&self) -> bool {
        self.date.is_some() && (self.amount.is_some() || self.debit.is_some() || self.credit.is_some())
    }

    /// An inferred custom profile, or `None` when detection is not usable
    pub fn to_profile(&self, name: &str) -> Option<ImportProfile> {
        if !self.is_usable() {
            return None;
        }

        let mut profile = ImportProfile::new(name, SourceFormat::Csv);
        profile.field_mapping.clear();

        let columns = [
            (CanonicalField::Date, &self.date),
            (CanonicalField::Amount, &self.amount),
            (CanonicalField::Description, &self.description),
            (CanonicalField::Debit, &self.debit),
            (CanonicalField::Credit, &self.credit),
            (CanonicalField::Direction, &self.direction),
            (CanonicalField::Category, &self.category),
            (CanonicalField::Balance, &self.balance),
        ];
        for (field, column) in columns {
            if let Some(column) = column {
                profile.field_mapping.insert(field, FieldSelector::name(column.clone()));
            }
        }

        if self.amount.is_none() {
            profile.amount_sign_convention = AmountSignConvention::DebitCredit;
        }
        Some(profile)
    }
}

/// Auto-detect column mapping from CSV headers
pub fn detect_columns(headers: &[String]) -> DetectedColumns {
    let mut detected = DetectedColumns::default();
    let mut taken: Vec<&str> = Vec::new();

    detected.date = find(headers, DATE_PATTERNS, &taken);
    taken.extend(detected.date.as_deref());

    detected.balance = find(headers, BALANCE_PATTERNS, &taken);
    taken.extend(detected.balance.as_deref());

    // Prefer a single amount column, fall back to debit/credit
    detected.amount = find(headers, AMOUNT_PATTERNS, &taken);
    taken.extend(detected.amount.as_deref());
    if detected.amount.is_none() {
        detected.debit = find(headers, DEBIT_PATTERNS, &taken);
        taken.extend(detected.debit.as_deref());
        detected.credit = find(headers, CREDIT_PATTERNS, &taken);
        taken.extend(detected.credit.as_deref());
    }

    detected.direction = find(headers, DIRECTION_PATTERNS, &taken);
    taken.extend(detected.direction.as_deref());

    detected.category = find(headers, CATEGORY_PATTERNS, &taken);
    taken.extend(detected.category.as_deref());

    detected.description = find(headers, DESC_PATTERNS, &taken)
        .or_else(|| find(headers, FALLBACK_DESC_PATTERNS, &taken));

    tracing::debug!(?detected, "detected columns");
    detected
}

fn find(headers: &[String], patterns: &[&str], taken: &[&str]) -> Option<String> {
    headers
        .iter()
        .filter(|h| !h.trim().is_empty() && !taken.contains(&h.as_str()))
        .find(|h| patterns.iter().any(|p| header_matches(h, p)))
        .cloned()
}

/// Multi-word patterns match as substrings, single words as whole words
fn header_matches(header: &str, pattern: &str) -> bool {
    let lower = header.trim().to_lowercase();
    if pattern.contains([' ', '/']) {
        return lower.contains(pattern);
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_basic_columns() {
        let detected = detect_columns(&headers(&["Transaction Date", "Description", "Amount", "Balance"]));
        assert_eq!(detected.date.as_deref(), Some("Transaction Date"));
        assert_eq!(detected.description.as_deref(), Some("Description"));
        assert_eq!(detected.amount.as_deref(), Some("Amount"));
        assert_eq!(detected.balance.as_deref(), Some("Balance"));
        assert!(detected.is_usable());
    }

    #[test]
    fn test_detect_debit_credit_without_amount() {
        let detected = detect_columns(&headers(&["Date", "Details", "Withdrawals", "Deposits"]));
        assert_eq!(detected.amount, None);
        assert_eq!(detected.debit.as_deref(), Some("Withdrawals"));
        assert_eq!(detected.credit.as_deref(), Some("Deposits"));
        assert_eq!(detected.description.as_deref(), Some("Details"));

        let profile = detected.to_profile("detected").unwrap();
        assert_eq!(profile.amount_sign_convention, AmountSignConvention::DebitCredit);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_short_patterns_match_whole_words_only() {
        // "cr" must not match inside "Description"
        let detected = detect_columns(&headers(&["Date", "Description", "Debit"]));
        assert_eq!(detected.credit, None);
        assert_eq!(detected.description.as_deref(), Some("Description"));
    }

    #[test]
    fn test_fallback_description() {
        let detected = detect_columns(&headers(&["Date", "Name", "Amount"]));
        assert_eq!(detected.description.as_deref(), Some("Name"));
    }

    #[test]
    fn test_portuguese_headers() {
        let detected = detect_columns(&headers(&["Data", "Lançamento", "Valor"]));
        assert_eq!(detected.date.as_deref(), Some("Data"));
        assert_eq!(detected.description.as_deref(), Some("Lançamento"));
        assert_eq!(detected.amount.as_deref(), Some("Valor"));
    }

    #[test]
    fn test_unusable_detection() {
        let detected = detect_columns(&headers(&["When", "What"]));
        assert!(!detected.is_usable());
        assert!(detected.to_profile("x").is_none());
    }
}
