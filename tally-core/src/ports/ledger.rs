//! Ledger ports - read and write access to the user's transactions

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Transaction};

/// Read access to accounts and their transactions
pub trait LedgerReader {
    fn get_account(&self, account_id: &str) -> Result<Option<Account>>;

    /// All transactions of an account, in any order
    fn get_transactions(&self, account_id: &str) -> Result<Vec<Transaction>>;
}

/// Write access, used by callers after review or confirmation
///
/// The import and reconciliation services never call this themselves.
pub trait LedgerWriter {
    /// Store a transaction and return its id
    fn add_transaction(&mut self, transaction: &Transaction) -> Result<Uuid>;
}
