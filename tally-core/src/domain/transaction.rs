//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::result::{Error, Result};

static NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnull\b").unwrap());
static CARD_MASK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[x*]{4,}\d{4}").unwrap());
static ACCOUNT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[x0-9]{7,12}").unwrap());
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]").unwrap());

/// Direction of a ledger transaction
///
/// Stored transactions may carry an unsigned amount, so the type is
/// authoritative over the raw sign when computing balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    /// Negative amounts are expenses, everything else income
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Self::Expense
        } else {
            Self::Income
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(Error::validation(format!("Unknown transaction type: {}", other))),
        }
    }
}

/// A single financial transaction belonging to an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: String,
    pub date: NaiveDate,
    /// Either signed or unsigned; see `signed_amount`
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,

    // =========================================================================
    // Import tracking
    // =========================================================================
    /// Hash of account, date, amount and normalized description
    #[serde(default)]
    pub fingerprint: Option<String>,
    /// Which import batch this transaction belongs to
    #[serde(default)]
    pub import_batch_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with required fields; the type follows the sign
    pub fn new(id: Uuid, account_id: impl Into<String>, amount: Decimal, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id,
            account_id: account_id.into(),
            date,
            amount,
            transaction_type: TransactionType::from_amount(amount),
            description: None,
            category: None,
            tags: Vec::new(),
            notes: None,
            fingerprint: None,
            import_batch_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount with the direction implied by the type
    ///
    /// Income and positive transfers add their absolute amount; expenses
    /// and every other transfer subtract it.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount.abs(),
            TransactionType::Transfer if self.amount > Decimal::ZERO => self.amount,
            TransactionType::Transfer | TransactionType::Expense => -self.amount.abs(),
        }
    }

    /// Ensure the fingerprint is set
    pub fn ensure_fingerprint(&mut self) {
        if self.fingerprint.is_none() {
            self.fingerprint = Some(calculate_fingerprint(
                &self.account_id,
                self.date,
                self.signed_amount(),
                self.description.as_deref(),
            ));
        }
    }

    /// Normalize tags: deduplicate, trim whitespace, remove empty
    pub fn normalize_tags(tags: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();

        for tag in tags {
            let trimmed = tag.trim().to_string();
            if !trimmed.is_empty() && seen.insert(trimmed.clone()) {
                result.push(trimmed);
            }
        }

        result
    }
}

/// Calculate fingerprint hash for deduplication
///
/// Uses: account_id, date, amount (with sign), and normalized description.
pub fn calculate_fingerprint(
    account_id: &str,
    date: NaiveDate,
    amount: Decimal,
    description: Option<&str>,
) -> String {
    // Normalize amount: treat -0 as 0
    let amount = if amount.is_zero() { Decimal::ZERO } else { amount };

    let fingerprint_str = format!(
        "{}|{}|{:.2}|{}",
        account_id,
        date.format("%Y-%m-%d"),
        amount,
        normalize_description(description.unwrap_or(""))
    );

    // SHA256 hash, truncated to 16 chars
    let mut hasher = Sha256::new();
    hasher.update(fingerprint_str.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

/// Normalize a description for comparison
///
/// - Lowercase
/// - Remove literal "null" strings (CSV exports)
/// - Remove card number masks (XXXXXXXXXXXX1234, ****1234)
/// - Normalize account/phone numbers to last 4 digits
/// - Remove whitespace and special characters
pub fn normalize_description(desc: &str) -> String {
    let desc = desc.to_lowercase();

    let mut normalized = NULL_RE.replace_all(&desc, "").to_string();
    normalized = CARD_MASK_RE.replace_all(&normalized, "").to_string();

    normalized = ACCOUNT_NUMBER_RE
        .replace_all(&normalized, |caps: &regex::Captures| {
            let text = &caps[0];
            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() >= 4 {
                digits[digits.len() - 4..].to_string()
            } else {
                text.to_string()
            }
        })
        .to_string();

    NON_ALNUM_RE.replace_all(&normalized, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fingerprint_generation() {
        let fp = calculate_fingerprint("acct-1", date(2025, 1, 15), Decimal::new(-5000, 2), Some("ACME STORE"));
        assert_eq!(fp.len(), 16);

        // Formatting noise does not change the fingerprint
        let same = calculate_fingerprint("acct-1", date(2025, 1, 15), Decimal::new(-50, 0), Some("  acme   store "));
        assert_eq!(fp, same);

        let other_account = calculate_fingerprint("acct-2", date(2025, 1, 15), Decimal::new(-5000, 2), Some("ACME STORE"));
        assert_ne!(fp, other_account);
    }

    #[test]
    fn test_description_normalization() {
        // Card mask removal
        assert!(!normalize_description("PURCHASE XXXXXXXXXXXX1234 STORE").contains("xxxx"));
        assert_eq!(normalize_description("PURCHASE ****1234 STORE"), "purchasestore");

        // Null removal
        assert!(!normalize_description("null PAYMENT null").contains("null"));

        // Account number normalization
        let normalized = normalize_description("PAYMENT 7208987070");
        assert!(normalized.contains("7070"));
        assert!(!normalized.contains("720898"));

        // Accented letters survive
        assert_eq!(normalize_description("Café Été"), "caféété");
    }

    #[test]
    fn test_signed_amount_uses_type() {
        let d = date(2024, 3, 1);
        let mut tx = Transaction::new(Uuid::new_v4(), "a", Decimal::new(5000, 2), d);
        tx.transaction_type = TransactionType::Expense;
        assert_eq!(tx.signed_amount(), Decimal::new(-5000, 2));

        tx.transaction_type = TransactionType::Income;
        tx.amount = Decimal::new(-2000, 2);
        assert_eq!(tx.signed_amount(), Decimal::new(2000, 2));

        tx.transaction_type = TransactionType::Transfer;
        assert_eq!(tx.signed_amount(), Decimal::new(-2000, 2));
        tx.amount = Decimal::new(2000, 2);
        assert_eq!(tx.signed_amount(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_type_from_amount() {
        assert_eq!(TransactionType::from_amount(Decimal::new(-1, 2)), TransactionType::Expense);
        assert_eq!(TransactionType::from_amount(Decimal::new(1, 2)), TransactionType::Income);
        assert_eq!(TransactionType::from_amount(Decimal::ZERO), TransactionType::Income);
    }

    #[test]
    fn test_tag_normalization() {
        let tags = vec![
            "food".to_string(),
            "  groceries ".to_string(),
            "food".to_string(), // duplicate
            "".to_string(),     // empty
        ];
        let normalized = Transaction::normalize_tags(&tags);
        assert_eq!(normalized, vec!["food", "groceries"]);
    }
}
