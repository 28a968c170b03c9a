//! Candidate transaction domain model
//!
//! A parsed but not yet committed transaction produced during one import.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::{calculate_fingerprint, Transaction, TransactionType};

/// Where a candidate came from in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRowRef {
    /// 1-based position among the file's data records
    pub row: usize,
    /// Physical line the record starts on, when the format has lines
    pub line: Option<usize>,
}

impl SourceRowRef {
    pub fn new(row: usize, line: Option<usize>) -> Self {
        Self { row, line }
    }
}

impl fmt::Display for SourceRowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "row {} (line {})", self.row, line),
            None => write!(f, "row {}", self.row),
        }
    }
}

/// A normalized transaction awaiting review
///
/// The fingerprint covers account, date, amount and description. Change
/// those only through the `with_*` builders, which recompute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTransaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_category: Option<String>,
    pub account_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub source_row_ref: SourceRowRef,
    pub fingerprint: String,
}

impl CandidateTransaction {
    pub fn new(
        account_id: impl Into<String>,
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        source_row_ref: SourceRowRef,
    ) -> Self {
        let account_id = account_id.into();
        let description = description.into();
        let fingerprint = calculate_fingerprint(&account_id, date, amount, Some(&description));
        Self {
            date,
            amount,
            transaction_type: TransactionType::from_amount(amount),
            description,
            raw_category: None,
            account_id,
            tags: Vec::new(),
            notes: None,
            source_row_ref,
            fingerprint,
        }
    }

    /// Replace the amount; the type follows the new sign
    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self.transaction_type = TransactionType::from_amount(amount);
        self.refresh_fingerprint();
        self
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self.refresh_fingerprint();
        self
    }

    fn refresh_fingerprint(&mut self) {
        self.fingerprint = calculate_fingerprint(&self.account_id, self.date, self.amount, Some(&self.description));
    }

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.raw_category = category.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_tags(mut self, tags: &[String]) -> Self {
        self.tags = Transaction::normalize_tags(tags);
        self
    }

    pub fn is_zero_amount(&self) -> bool {
        self.amount.is_zero()
    }

    /// Convert into a ledger transaction for the caller's ledger write
    pub fn to_transaction(&self, batch_id: &str) -> Transaction {
        let mut tx = Transaction::new(Uuid::new_v4(), self.account_id.clone(), self.amount, self.date);
        tx.transaction_type = self.transaction_type;
        tx.description = Some(self.description.clone()).filter(|d| !d.is_empty());
        tx.category = self.raw_category.clone();
        tx.notes = self.notes.clone();
        let mut tags = self.tags.clone();
        tags.push("imported".to_string());
        tx.tags = Transaction::normalize_tags(&tags);
        tx.fingerprint = Some(self.fingerprint.clone());
        tx.import_batch_id = Some(batch_id.to_string());
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_type_follows_sign() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let c = CandidateTransaction::new("acct", date, Decimal::new(-1500, 2), "Coffee", SourceRowRef::new(1, Some(2)));
        assert_eq!(c.transaction_type, TransactionType::Expense);
        assert_eq!(c.fingerprint.len(), 16);

        let c = CandidateTransaction::new("acct", date, Decimal::new(250000, 2), "Salary", SourceRowRef::new(2, Some(3)));
        assert_eq!(c.transaction_type, TransactionType::Income);
    }

    #[test]
    fn test_to_transaction_carries_import_tracking() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let c = CandidateTransaction::new("acct", date, Decimal::new(-1500, 2), "Coffee", SourceRowRef::new(1, None))
            .with_category(Some("Food".to_string()))
            .with_tags(&["cafe".to_string()]);

        let tx = c.to_transaction("import_20240115_120000");
        assert_eq!(tx.account_id, "acct");
        assert_eq!(tx.amount, Decimal::new(-1500, 2));
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.category.as_deref(), Some("Food"));
        assert_eq!(tx.tags, vec!["cafe", "imported"]);
        assert_eq!(tx.fingerprint.as_deref(), Some(c.fingerprint.as_str()));
        assert_eq!(tx.import_batch_id.as_deref(), Some("import_20240115_120000"));
    }

    #[test]
    fn test_builders_keep_fingerprint_current() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let row = SourceRowRef::new(1, None);
        let base = CandidateTransaction::new("acct", date, Decimal::new(-1500, 2), "Coffee", row);

        let changed = base.clone().with_amount(Decimal::new(1500, 2));
        let fresh = CandidateTransaction::new("acct", date, Decimal::new(1500, 2), "Coffee", row);
        assert_eq!(changed.fingerprint, fresh.fingerprint);
        assert_ne!(changed.fingerprint, base.fingerprint);
        assert_eq!(changed.transaction_type, TransactionType::Income);

        let moved = base.clone().with_account("other");
        assert_eq!(
            moved.fingerprint,
            CandidateTransaction::new("other", date, Decimal::new(-1500, 2), "Coffee", row).fingerprint
        );
    }

    #[test]
    fn test_row_ref_display() {
        assert_eq!(SourceRowRef::new(3, Some(4)).to_string(), "row 3 (line 4)");
        assert_eq!(SourceRowRef::new(3, None).to_string(), "row 3");
    }
}
