//! In-memory adapters
//!
//! The ledger and profile store as plain collections. Used directly by
//! callers that already hold their data in memory, and as the state behind
//! the file-backed adapters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, ImportProfile, Transaction};
use crate::ports::{LedgerReader, LedgerWriter, ProfileStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryLedger {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account by id
    pub fn upsert_account(&mut self, mut account: Account) -> Result<()> {
        account.currency = Account::normalize_currency(&account.currency);
        account.validate().map_err(Error::validation)?;
        match self.accounts.iter_mut().find(|a| a.id == account.id) {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
        Ok(())
    }

    pub fn with_account(mut self, account: Account) -> Result<Self> {
        self.upsert_account(account)?;
        Ok(self)
    }
}

impl LedgerReader for MemoryLedger {
    fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.iter().find(|a| a.id == account_id).cloned())
    }

    fn get_transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }
}

impl LedgerWriter for MemoryLedger {
    fn add_transaction(&mut self, transaction: &Transaction) -> Result<Uuid> {
        if self.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(Error::validation(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        let mut stored = transaction.clone();
        stored.ensure_fingerprint();
        self.transactions.push(stored);
        Ok(transaction.id)
    }
}

/// Profiles held in a map keyed by normalized name
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: BTreeMap<String, ImportProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get_profile(&self, name: &str) -> Result<Option<ImportProfile>> {
        Ok(self.profiles.get(&ImportProfile::normalize_name(name)).cloned())
    }

    fn save_profile(&mut self, profile: &ImportProfile) -> Result<()> {
        self.profiles
            .insert(ImportProfile::normalize_name(&profile.name), profile.clone());
        Ok(())
    }

    fn list_profiles(&self) -> Result<Vec<ImportProfile>> {
        Ok(self.profiles.values().cloned().collect())
    }

    fn delete_profile(&mut self, name: &str) -> Result<bool> {
        Ok(self.profiles.remove(&ImportProfile::normalize_name(name)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_ledger_filters_by_account() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut ledger = MemoryLedger::new()
            .with_account(Account::new("checking", "Checking", Decimal::ZERO))
            .unwrap();

        let tx = Transaction::new(Uuid::new_v4(), "checking", Decimal::new(-500, 2), date);
        let other = Transaction::new(Uuid::new_v4(), "savings", Decimal::new(100, 2), date);
        assert_eq!(ledger.add_transaction(&tx).unwrap(), tx.id);
        ledger.add_transaction(&other).unwrap();

        let found = ledger.get_transactions("checking").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].fingerprint.is_some());
        assert!(ledger.get_account("checking").unwrap().is_some());
        assert!(ledger.get_account("savings").unwrap().is_none());

        assert!(ledger.add_transaction(&tx).is_err());
    }

    #[test]
    fn test_account_currency_normalized() {
        let mut account = Account::new("a", "A", Decimal::ZERO);
        account.currency = " eur ".to_string();
        let ledger = MemoryLedger::new().with_account(account).unwrap();
        assert_eq!(ledger.accounts[0].currency, "EUR");
    }

    #[test]
    fn test_profile_store_roundtrip() {
        let mut store = MemoryProfileStore::new();
        let profile = ImportProfile::new(" Chase ", crate::domain::SourceFormat::Csv);
        store.save_profile(&profile).unwrap();

        assert!(store.get_profile("Chase").unwrap().is_some());
        assert_eq!(store.list_profiles().unwrap().len(), 1);
        assert!(store.delete_profile("Chase").unwrap());
        assert!(!store.delete_profile("Chase").unwrap());
    }
}
