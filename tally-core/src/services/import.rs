//! Import service - statement file import
//!
//! Parse, map, normalize and duplicate-scan a statement file into a
//! reviewable result. Nothing is written to the ledger here; the caller
//! commits `ImportResult::to_ledger_transactions()` after review.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::ImportSettings;
use crate::domain::result::{Error, Result};
use crate::domain::{
    CandidateTransaction, DayMonthOrder, DuplicateMatch, ImportProfile, NormalizationWarning,
    SourceRowRef, Transaction, TransactionType,
};
use crate::formats::{decode_text, parse_statement, StatementMetadata};
use crate::mapping::ColumnMapper;
use crate::normalize::{amount, DateNormalizer};
use crate::ports::LedgerReader;

use super::duplicate::DuplicateChecker;

/// A candidate held back as a likely duplicate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDuplicate {
    pub candidate: CandidateTransaction,
    #[serde(rename = "match")]
    pub matched: DuplicateMatch,
}

/// A record that could not become a candidate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRow {
    pub row_ref: SourceRowRef,
    pub reason: String,
}

/// Totals over one import run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatistics {
    pub total_records: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub failed: usize,
    pub warnings: usize,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    /// Sum of positive imported amounts
    pub total_inflow: Decimal,
    /// Sum of negative imported amounts, as a positive number
    pub total_outflow: Decimal,
    pub net: Decimal,
    /// SHA-256 of the source bytes, hex
    pub source_checksum: String,
}

/// Result of an import run, pending the caller's review
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub batch_id: String,
    pub account_id: String,
    pub imported: Vec<CandidateTransaction>,
    pub skipped_duplicates: Vec<SkippedDuplicate>,
    pub failed: Vec<FailedRow>,
    pub warnings: Vec<NormalizationWarning>,
    #[serde(skip_serializing_if = "StatementMetadata::is_empty")]
    pub metadata: StatementMetadata,
    pub statistics: ImportStatistics,
}

impl ImportResult {
    /// Move a skipped duplicate back into the imported set
    pub fn include_duplicate(&mut self, row: usize) -> Result<()> {
        let index = self
            .skipped_duplicates
            .iter()
            .position(|s| s.candidate.source_row_ref.row == row)
            .ok_or_else(|| Error::not_found(format!("No skipped duplicate at row {}", row)))?;

        let skipped = self.skipped_duplicates.remove(index);
        self.imported.push(skipped.candidate);
        self.imported.sort_by_key(|c| c.source_row_ref.row);
        self.refresh_statistics();
        Ok(())
    }

    /// Drop an imported candidate
    pub fn exclude(&mut self, row: usize) -> Result<CandidateTransaction> {
        let index = self
            .imported
            .iter()
            .position(|c| c.source_row_ref.row == row)
            .ok_or_else(|| Error::not_found(format!("No imported transaction at row {}", row)))?;

        let removed = self.imported.remove(index);
        self.refresh_statistics();
        Ok(removed)
    }

    /// Ledger transactions for the reviewed candidates, tagged with this batch
    pub fn to_ledger_transactions(&self) -> Vec<Transaction> {
        self.imported
            .iter()
            .map(|c| c.to_transaction(&self.batch_id))
            .collect()
    }

    fn refresh_statistics(&mut self) {
        let stats = &mut self.statistics;
        stats.imported = self.imported.len();
        stats.skipped_duplicates = self.skipped_duplicates.len();
        stats.failed = self.failed.len();
        stats.warnings = self.warnings.len();
        stats.earliest_date = self.imported.iter().map(|c| c.date).min();
        stats.latest_date = self.imported.iter().map(|c| c.date).max();

        stats.total_inflow = self
            .imported
            .iter()
            .filter(|c| c.amount > Decimal::ZERO)
            .map(|c| c.amount)
            .sum();
        stats.total_outflow = self
            .imported
            .iter()
            .filter(|c| c.amount < Decimal::ZERO)
            .map(|c| c.amount.abs())
            .sum();
        stats.net = stats.total_inflow - stats.total_outflow;
    }
}

/// Import service for statement files
#[derive(Debug, Clone)]
pub struct ImportService {
    checker: DuplicateChecker,
    default_date_order: DayMonthOrder,
    batch_warning_rows: usize,
    today: Option<NaiveDate>,
}

impl ImportService {
    pub fn new(settings: &ImportSettings) -> Result<Self> {
        Ok(Self {
            checker: DuplicateChecker::from_settings(settings)?,
            default_date_order: settings.default_date_order,
            batch_warning_rows: settings.batch_warning_rows,
            today: None,
        })
    }

    /// Fix the date substituted for unparseable dates
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn checker(&self) -> &DuplicateChecker {
        &self.checker
    }

    /// Import a statement file for one account
    ///
    /// A structurally broken file fails with `Error::Parse`; individual bad
    /// records land in `ImportResult::failed`.
    pub fn import_file(
        &self,
        bytes: &[u8],
        profile: &ImportProfile,
        account_id: &str,
        ledger: &impl LedgerReader,
    ) -> Result<ImportResult> {
        if ledger.get_account(account_id)?.is_none() {
            return Err(Error::not_found(format!("Account not found: {}", account_id)));
        }
        let existing = ledger.get_transactions(account_id)?;
        self.import_bytes(bytes, profile, account_id, &existing)
    }

    /// Import against an already loaded set of ledger transactions
    pub fn import_bytes(
        &self,
        bytes: &[u8],
        profile: &ImportProfile,
        account_id: &str,
        existing: &[Transaction],
    ) -> Result<ImportResult> {
        profile.validate()?;

        let decoded = decode_text(bytes);
        let parsed = parse_statement(&decoded.text, profile)?;

        let mut warnings = Vec::new();
        if decoded.non_utf8 {
            warnings.push(NormalizationWarning::NonUtf8Source);
        }

        let mut dates = DateNormalizer::for_profile(profile, self.default_date_order);
        if let Some(today) = self.today {
            dates = dates.with_today(today);
        }

        let total_records = parsed.records.len();
        let mut candidates = Vec::with_capacity(total_records);
        let mut failed = Vec::new();

        for record in &parsed.records {
            let row_ref = record.row_ref();

            let mapped = match ColumnMapper::resolve(record, profile) {
                Ok(mapped) => mapped,
                Err(e) => {
                    tracing::debug!(row = row_ref.row, error = %e, "record failed mapping");
                    failed.push(FailedRow {
                        row_ref,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let value = match amount::resolve(&mapped.amount, profile.amount_sign_convention) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(row = row_ref.row, error = %e, "record failed amount normalization");
                    failed.push(FailedRow {
                        row_ref,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let date = dates.parse(&mapped.date);
            if date.fell_back {
                warnings.push(NormalizationWarning::DateFallback {
                    row: row_ref.row,
                    value: mapped.date.clone(),
                    substituted: date.date,
                });
            }
            if value.is_zero() {
                warnings.push(NormalizationWarning::ZeroAmount { row: row_ref.row });
            }

            let mut tags = profile.default_tags.clone();
            tags.extend(mapped.tags.iter().cloned());

            let direction = mapped.direction();
            let mut candidate =
                CandidateTransaction::new(account_id, date.date, value, mapped.description, row_ref)
                    .with_category(mapped.category)
                    .with_notes(mapped.notes)
                    .with_tags(&tags);
            if direction.as_deref() == Some("XFER") {
                candidate = candidate.with_type(TransactionType::Transfer);
            }
            candidates.push(candidate);
        }

        if candidates.len() > self.batch_warning_rows {
            tracing::warn!(
                rows = candidates.len(),
                limit = self.batch_warning_rows,
                "large batch, duplicate scan may be slow"
            );
            warnings.push(NormalizationWarning::LargeBatch {
                rows: candidates.len(),
                limit: self.batch_warning_rows,
            });
        }

        let scan = self.checker.scan(candidates, existing);

        let mut result = ImportResult {
            batch_id: Utc::now().format("import_%Y%m%d_%H%M%S").to_string(),
            account_id: account_id.to_string(),
            imported: scan.unique,
            skipped_duplicates: scan
                .duplicates
                .into_iter()
                .map(|(candidate, matched)| SkippedDuplicate { candidate, matched })
                .collect(),
            failed,
            warnings,
            metadata: parsed.metadata,
            statistics: ImportStatistics {
                total_records,
                source_checksum: hex::encode(Sha256::digest(bytes)),
                ..ImportStatistics::default()
            },
        };
        result.refresh_statistics();

        tracing::info!(
            batch_id = %result.batch_id,
            account_id,
            format = %parsed.format,
            records = total_records,
            imported = result.statistics.imported,
            skipped = result.statistics.skipped_duplicates,
            failed = result.statistics.failed,
            warnings = result.statistics.warnings,
            "import complete"
        );

        Ok(result)
    }
}
