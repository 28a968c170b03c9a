//! Duplicate checker
//!
//! One weighted similarity score, used both against the existing ledger and
//! within an incoming batch.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::ImportSettings;
use crate::domain::result::Result;
use crate::domain::{normalize_description, CandidateTransaction, DuplicateMatch, MatchField, Transaction};

const DATE_WEIGHT: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
const AMOUNT_WEIGHT: Decimal = Decimal::from_parts(35, 0, 0, false, 2);
const DESCRIPTION_WEIGHT: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
const ACCOUNT_WEIGHT: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
const NEAR_AMOUNT_FACTOR: Decimal = Decimal::from_parts(9, 0, 0, false, 1);
const HALF: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Default composite threshold on the 0..1 scale
pub const DEFAULT_THRESHOLD: Decimal = Decimal::from_parts(85, 0, 0, false, 2);

/// The fields the score looks at
#[derive(Debug, Clone, Copy)]
pub struct ComparisonKey<'a> {
    pub account_id: &'a str,
    pub date: NaiveDate,
    /// Signed, with the transaction type applied
    pub amount: Decimal,
    pub description: &'a str,
}

/// Anything that can be scored against a candidate
pub trait Comparable {
    fn comparison_key(&self) -> ComparisonKey<'_>;
}

impl Comparable for CandidateTransaction {
    fn comparison_key(&self) -> ComparisonKey<'_> {
        ComparisonKey {
            account_id: &self.account_id,
            date: self.date,
            amount: self.amount,
            description: &self.description,
        }
    }
}

impl Comparable for Transaction {
    fn comparison_key(&self) -> ComparisonKey<'_> {
        ComparisonKey {
            account_id: &self.account_id,
            date: self.date,
            amount: self.signed_amount(),
            description: self.description.as_deref().unwrap_or(""),
        }
    }
}

/// Per-field contributions to a composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub date: Decimal,
    pub amount: Decimal,
    pub description: Decimal,
    pub account: Decimal,
}

impl ScoreBreakdown {
    /// Sum of the weighted fields, 0..1
    pub fn composite(&self) -> Decimal {
        self.date + self.amount + self.description + self.account
    }

    /// Composite on the reported 0..100 scale
    pub fn similarity(&self) -> Decimal {
        (self.composite() * Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// Fields that scored their full weight
    pub fn matched_fields(&self) -> Vec<MatchField> {
        let mut fields = Vec::new();
        if self.date == DATE_WEIGHT {
            fields.push(MatchField::Date);
        }
        if self.amount == AMOUNT_WEIGHT {
            fields.push(MatchField::Amount);
        }
        if self.description == DESCRIPTION_WEIGHT {
            fields.push(MatchField::Description);
        }
        if self.account == ACCOUNT_WEIGHT {
            fields.push(MatchField::Account);
        }
        fields
    }
}

/// Score two transactions field by field
pub fn score_breakdown(a: &impl Comparable, b: &impl Comparable) -> ScoreBreakdown {
    let a = a.comparison_key();
    let b = b.comparison_key();

    let date = match (a.date - b.date).num_days().abs() {
        0 => DATE_WEIGHT,
        1 => DATE_WEIGHT * HALF,
        _ => Decimal::ZERO,
    };

    let amount_diff = (a.amount - b.amount).abs();
    let amount = if amount_diff.is_zero() {
        AMOUNT_WEIGHT
    } else if amount_diff < CENT {
        AMOUNT_WEIGHT * NEAR_AMOUNT_FACTOR
    } else if amount_diff < Decimal::ONE {
        AMOUNT_WEIGHT * HALF
    } else {
        Decimal::ZERO
    };

    let description = DESCRIPTION_WEIGHT * description_similarity(a.description, b.description);

    let account = if a.account_id == b.account_id {
        ACCOUNT_WEIGHT
    } else {
        Decimal::ZERO
    };

    ScoreBreakdown {
        date,
        amount,
        description,
        account,
    }
}

/// Composite similarity on the 0..100 scale
pub fn score(a: &impl Comparable, b: &impl Comparable) -> Decimal {
    score_breakdown(a, b).similarity()
}

/// `(maxLen - levenshtein) / maxLen` over normalized descriptions
fn description_similarity(a: &str, b: &str) -> Decimal {
    let a = normalize_description(a);
    let b = normalize_description(b);
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return Decimal::ONE;
    }
    let distance = strsim::levenshtein(&a, &b).min(max_len);
    Decimal::from(max_len - distance) / Decimal::from(max_len)
}

/// Outcome of scanning one batch
#[derive(Debug, Default)]
pub struct DuplicateScan {
    /// Candidates that matched nothing, in source order
    pub unique: Vec<CandidateTransaction>,
    /// Flagged candidates with the match that flagged them
    pub duplicates: Vec<(CandidateTransaction, DuplicateMatch)>,
}

/// Flags likely duplicates at or above a composite threshold
#[derive(Debug, Clone)]
pub struct DuplicateChecker {
    threshold: Decimal,
    window_days: i64,
}

impl Default for DuplicateChecker {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, 3)
    }
}

impl DuplicateChecker {
    /// `threshold` is on the 0..1 scale
    pub fn new(threshold: Decimal, window_days: i64) -> Self {
        Self {
            threshold,
            window_days: window_days.max(0),
        }
    }

    pub fn from_settings(settings: &ImportSettings) -> Result<Self> {
        Ok(Self::new(settings.threshold_decimal()?, settings.ledger_window_days))
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    pub fn is_duplicate(&self, breakdown: &ScoreBreakdown) -> bool {
        breakdown.composite() >= self.threshold
    }

    /// Best-scoring ledger transaction of the same account within the date window
    pub fn find_ledger_duplicate(
        &self,
        candidate: &CandidateTransaction,
        existing: &[Transaction],
    ) -> Option<DuplicateMatch> {
        let mut best: Option<(&Transaction, ScoreBreakdown)> = None;

        for tx in existing {
            if tx.account_id != candidate.account_id
                || (tx.date - candidate.date).num_days().abs() > self.window_days
            {
                continue;
            }
            let breakdown = score_breakdown(candidate, tx);
            let better = best.map_or(true, |(_, current)| breakdown.composite() > current.composite());
            if better {
                best = Some((tx, breakdown));
            }
        }

        let (tx, breakdown) = best?;
        if !self.is_duplicate(&breakdown) {
            return None;
        }
        Some(DuplicateMatch {
            candidate_ref: candidate.source_row_ref,
            existing_transaction_id: Some(tx.id),
            within_batch_ref: None,
            similarity: breakdown.similarity(),
            matched_fields: breakdown.matched_fields(),
        })
    }

    /// Earliest earlier row the candidate duplicates
    pub fn find_batch_duplicate(
        &self,
        candidate: &CandidateTransaction,
        earlier: &[CandidateTransaction],
    ) -> Option<DuplicateMatch> {
        earlier.iter().find_map(|other| {
            let breakdown = score_breakdown(candidate, other);
            self.is_duplicate(&breakdown).then(|| DuplicateMatch {
                candidate_ref: candidate.source_row_ref,
                existing_transaction_id: None,
                within_batch_ref: Some(other.source_row_ref),
                similarity: breakdown.similarity(),
                matched_fields: breakdown.matched_fields(),
            })
        })
    }

    /// Split a batch into unique candidates and duplicates
    ///
    /// Each candidate is checked against the ledger first, then against the
    /// earlier rows of the batch that were not themselves flagged.
    pub fn scan(&self, candidates: Vec<CandidateTransaction>, existing: &[Transaction]) -> DuplicateScan {
        let mut scan = DuplicateScan::default();

        for candidate in candidates {
            let found = self
                .find_ledger_duplicate(&candidate, existing)
                .or_else(|| self.find_batch_duplicate(&candidate, &scan.unique));

            match found {
                Some(matched) => {
                    tracing::debug!(
                        row = candidate.source_row_ref.row,
                        similarity = %matched.similarity,
                        in_ledger = matched.is_ledger_match(),
                        "flagged duplicate"
                    );
                    scan.duplicates.push((candidate, matched));
                }
                None => scan.unique.push(candidate),
            }
        }

        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceRowRef;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(row: usize, day: u32, cents: i64, description: &str) -> CandidateTransaction {
        CandidateTransaction::new(
            "acct-1",
            date(2024, 1, day),
            Decimal::new(cents, 2),
            description,
            SourceRowRef::new(row, Some(row + 1)),
        )
    }

    fn existing(day: u32, cents: i64, description: &str) -> Transaction {
        let mut tx = Transaction::new(Uuid::new_v4(), "acct-1", Decimal::new(cents, 2), date(2024, 1, day));
        tx.description = Some(description.to_string());
        tx
    }

    #[test]
    fn test_identical_transactions_score_100() {
        let a = candidate(1, 15, -4250, "GROCERY STORE");
        let b = candidate(2, 15, -4250, "Grocery Store");
        assert_eq!(score(&a, &b), Decimal::ONE_HUNDRED);
        assert_eq!(
            score_breakdown(&a, &b).matched_fields(),
            vec![MatchField::Date, MatchField::Amount, MatchField::Description, MatchField::Account]
        );
    }

    #[test]
    fn test_score_is_symmetric() {
        let a = candidate(1, 15, -4250, "Coffee Shop Downtown");
        let b = candidate(2, 16, -4200, "COFFEE SHOP");
        assert_eq!(score(&a, &b), score(&b, &a));

        let tx = existing(14, -4250, "Coffee");
        assert_eq!(score(&a, &tx), score(&tx, &a));
    }

    #[test]
    fn test_field_partial_weights() {
        let a = candidate(1, 15, 10000, "rent");

        // One day apart: half the date weight
        let b = candidate(2, 16, 10000, "rent");
        assert_eq!(score_breakdown(&a, &b).date, Decimal::new(125, 3));

        // Sub-cent difference: 0.9 of the amount weight
        let c = candidate(2, 15, 10000, "rent").with_amount(Decimal::new(100005, 3));
        assert_eq!(score_breakdown(&a, &c).amount, Decimal::new(315, 3));

        // Under a unit: half the amount weight
        let d = candidate(2, 15, 10050, "rent");
        assert_eq!(score_breakdown(&a, &d).amount, Decimal::new(175, 3));

        let e = candidate(2, 15, 10100, "rent");
        assert_eq!(score_breakdown(&a, &e).amount, Decimal::ZERO);
    }

    #[test]
    fn test_threshold_boundary() {
        let checker = DuplicateChecker::default();

        // 3 edits over 5 chars: description scores 0.4, composite exactly 0.85
        let a = candidate(1, 15, -1000, "abcde");
        let b = candidate(2, 15, -1000, "abxyz");
        let at = score_breakdown(&a, &b);
        assert_eq!(at.composite(), Decimal::new(85, 2));
        assert!(checker.is_duplicate(&at));

        // 5 edits over 8 chars: composite 0.84375
        let c = candidate(1, 15, -1000, "abcdefgh");
        let d = candidate(2, 15, -1000, "abcxyzwv");
        let below = score_breakdown(&c, &d);
        assert!(below.composite() < Decimal::new(85, 2));
        assert!(!checker.is_duplicate(&below));
    }

    #[test]
    fn test_ledger_duplicate_respects_account_and_window() {
        let checker = DuplicateChecker::default();
        let c = candidate(1, 15, -4250, "GROCERY");

        let mut other_account = existing(15, -4250, "GROCERY");
        other_account.account_id = "acct-2".to_string();
        let far = existing(25, -4250, "GROCERY");
        assert!(checker.find_ledger_duplicate(&c, &[other_account, far]).is_none());

        let near = existing(15, -4250, "Grocery");
        let best = existing(15, -4250, "GROCERY");
        let found = checker.find_ledger_duplicate(&c, &[existing(14, -4250, "GROCERY"), best.clone(), near]).unwrap();
        assert_eq!(found.existing_transaction_id, Some(best.id));
        assert_eq!(found.similarity, Decimal::ONE_HUNDRED);
        assert_eq!(found.within_batch_ref, None);
    }

    #[test]
    fn test_ledger_expense_stored_unsigned_still_matches() {
        let checker = DuplicateChecker::default();
        let c = candidate(1, 15, -4250, "GROCERY");
        let mut tx = existing(15, 4250, "GROCERY");
        tx.transaction_type = crate::domain::TransactionType::Expense;
        assert!(checker.find_ledger_duplicate(&c, &[tx]).is_some());
    }

    #[test]
    fn test_batch_scan_keeps_first_occurrence() {
        let checker = DuplicateChecker::default();
        let scan = checker.scan(
            vec![
                candidate(1, 15, -4250, "GROCERY"),
                candidate(2, 16, 250000, "SALARY"),
                candidate(3, 15, -4250, "GROCERY"),
                candidate(4, 15, -4250, "GROCERY"),
            ],
            &[],
        );

        assert_eq!(scan.unique.len(), 2);
        assert_eq!(scan.duplicates.len(), 2);
        for (dup, matched) in &scan.duplicates {
            assert!(dup.source_row_ref.row > 1);
            assert_eq!(matched.within_batch_ref.map(|r| r.row), Some(1));
        }
    }

    #[test]
    fn test_from_settings() {
        let settings = ImportSettings {
            duplicate_threshold: 0.9,
            ledger_window_days: 5,
            ..ImportSettings::default()
        };
        let checker = DuplicateChecker::from_settings(&settings).unwrap();
        assert_eq!(checker.threshold(), Decimal::new(9, 1));
        assert_eq!(checker.window_days(), 5);
    }
}
