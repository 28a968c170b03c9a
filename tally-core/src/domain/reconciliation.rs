//! Reconciliation snapshot domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Smallest difference that warrants an adjustment (one cent)
pub const ADJUSTMENT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Tags stamped on every adjustment transaction
pub const ADJUSTMENT_TAGS: [&str; 2] = ["reconciliation", "adjustment"];

/// System balance vs statement balance as of a cutoff date
///
/// Computed fresh on each request and never persisted; only the
/// adjustment transaction it may produce is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSnapshot {
    pub account_id: String,
    pub as_of_date: NaiveDate,
    pub system_balance: Decimal,
    pub statement_balance: Decimal,
    /// statement_balance - system_balance
    pub difference: Decimal,
    /// Ledger transactions folded into the system balance
    pub transaction_count: usize,
}

impl ReconciliationSnapshot {
    pub fn new(
        account_id: impl Into<String>,
        as_of_date: NaiveDate,
        system_balance: Decimal,
        statement_balance: Decimal,
        transaction_count: usize,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            as_of_date,
            system_balance,
            statement_balance,
            difference: statement_balance - system_balance,
            transaction_count,
        }
    }

    /// True when the difference is below one cent
    pub fn is_balanced(&self) -> bool {
        self.difference.abs() < ADJUSTMENT_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_is_one_cent() {
        assert_eq!(ADJUSTMENT_EPSILON, Decimal::new(1, 2));
    }

    #[test]
    fn test_difference_and_balanced() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let snapshot = ReconciliationSnapshot::new("a", date, Decimal::new(70000, 2), Decimal::new(70250, 2), 3);
        assert_eq!(snapshot.difference, Decimal::new(250, 2));
        assert!(!snapshot.is_balanced());

        let snapshot = ReconciliationSnapshot::new("a", date, Decimal::new(70000, 2), Decimal::new(700009, 3), 3);
        assert_eq!(snapshot.difference, Decimal::new(9, 3));
        assert!(snapshot.is_balanced());
    }
}
