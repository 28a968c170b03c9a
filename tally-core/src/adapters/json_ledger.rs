//! JSON file ledger
//!
//! A single `{ "accounts": [...], "transactions": [...] }` document. Writes
//! go to memory until `save`, which replaces the file atomically.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::memory::MemoryLedger;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transaction};
use crate::ports::{LedgerReader, LedgerWriter};

pub const LEDGER_FILE: &str = "ledger.json";

pub struct JsonLedger {
    path: PathBuf,
    ledger: MemoryLedger,
}

impl JsonLedger {
    /// Open the ledger at `path`; a missing file is an empty ledger
    pub fn open(path: &Path) -> Result<Self> {
        let ledger = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                MemoryLedger::default()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::Other(format!("ledger {} is not valid: {}", path.display(), e))
                })?
            }
        } else {
            MemoryLedger::default()
        };

        tracing::debug!(
            path = %path.display(),
            accounts = ledger.accounts.len(),
            transactions = ledger.transactions.len(),
            "opened ledger"
        );
        Ok(Self {
            path: path.to_path_buf(),
            ledger,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accounts(&self) -> &[Account] {
        &self.ledger.accounts
    }

    pub fn upsert_account(&mut self, account: Account) -> Result<()> {
        self.ledger.upsert_account(account)
    }

    /// Write the ledger: temp file in the same directory, then rename
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.ledger)?;
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl LedgerReader for JsonLedger {
    fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        self.ledger.get_account(account_id)
    }

    fn get_transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        self.ledger.get_transactions(account_id)
    }
}

impl LedgerWriter for JsonLedger {
    fn add_transaction(&mut self, transaction: &Transaction) -> Result<Uuid> {
        self.ledger.add_transaction(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let ledger = JsonLedger::open(&dir.path().join(LEDGER_FILE)).unwrap();
        assert!(ledger.accounts().is_empty());
        assert!(ledger.get_transactions("any").unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(LEDGER_FILE);

        let mut ledger = JsonLedger::open(&path).unwrap();
        ledger
            .upsert_account(Account::new("checking", "Checking", Decimal::new(50000, 2)))
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let tx = Transaction::new(Uuid::new_v4(), "checking", Decimal::new(20000, 2), date);
        ledger.add_transaction(&tx).unwrap();
        ledger.save().unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonLedger::open(&path).unwrap();
        let account = reopened.get_account("checking").unwrap().unwrap();
        assert_eq!(account.opening_balance, Decimal::new(50000, 2));
        let txs = reopened.get_transactions("checking").unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, tx.id);
        assert_eq!(txs[0].amount, Decimal::new(20000, 2));
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        std::fs::write(&path, "[oops").unwrap();
        assert!(JsonLedger::open(&path).is_err());
    }
}
