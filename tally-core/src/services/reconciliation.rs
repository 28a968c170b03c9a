//! Reconciliation service - align the ledger with a statement balance
//!
//! Computing a snapshot is pure and can be repeated at any time. The only
//! output that reaches the ledger is the adjustment transaction, and only
//! after the caller confirms it.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, ReconciliationSnapshot, Transaction, TransactionType, ADJUSTMENT_TAGS,
};
use crate::normalize::parse_amount;
use crate::ports::LedgerReader;

const ADJUSTMENT_DESCRIPTION: &str = "Balance reconciliation adjustment";

/// Parse a user-entered statement balance
pub fn parse_statement_balance(raw: &str) -> Result<Decimal> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidStatementBalance("statement balance is required".to_string()));
    }
    parse_amount(raw).map_err(|_| Error::InvalidStatementBalance(format!("'{}' is not an amount", raw.trim())))
}

/// Reconciliation engine over a ledger
pub struct ReconciliationEngine<'a, L: LedgerReader> {
    ledger: &'a L,
}

impl<'a, L: LedgerReader> ReconciliationEngine<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    /// System balance vs statement balance as of `cutoff` (inclusive)
    pub fn reconcile(
        &self,
        account_id: &str,
        cutoff: NaiveDate,
        statement_balance: Decimal,
    ) -> Result<ReconciliationSnapshot> {
        let account = self
            .ledger
            .get_account(account_id)?
            .ok_or_else(|| Error::not_found(format!("Account not found: {}", account_id)))?;
        let transactions = self.ledger.get_transactions(account_id)?;

        let snapshot = compute_snapshot(&account, &transactions, cutoff, statement_balance);
        tracing::info!(
            account_id,
            as_of = %cutoff,
            transactions = snapshot.transaction_count,
            balanced = snapshot.is_balanced(),
            "computed reconciliation snapshot"
        );
        Ok(snapshot)
    }

    /// Like `reconcile`, with the statement balance as entered text
    pub fn reconcile_text(
        &self,
        account_id: &str,
        cutoff: NaiveDate,
        statement_balance: &str,
    ) -> Result<ReconciliationSnapshot> {
        self.reconcile(account_id, cutoff, parse_statement_balance(statement_balance)?)
    }

    /// The adjustment for a confirmed snapshot, or `None` when it is balanced
    pub fn confirm(
        &self,
        snapshot: &ReconciliationSnapshot,
        category: Option<&str>,
        notes: Option<&str>,
    ) -> Option<Transaction> {
        adjustment_for(snapshot, category, notes)
    }
}

/// Fold the account's transactions up to the cutoff onto its opening balance
///
/// The transaction type decides the direction, not the stored sign.
pub fn compute_snapshot(
    account: &Account,
    transactions: &[Transaction],
    cutoff: NaiveDate,
    statement_balance: Decimal,
) -> ReconciliationSnapshot {
    let mut included: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.account_id == account.id && t.date <= cutoff)
        .collect();
    included.sort_by_key(|t| t.date);

    let system_balance = included
        .iter()
        .fold(account.opening_balance, |balance, t| balance + t.signed_amount());

    ReconciliationSnapshot::new(
        account.id.clone(),
        cutoff,
        system_balance,
        statement_balance,
        included.len(),
    )
}

/// Build the single balancing transaction for an unbalanced snapshot
pub fn adjustment_for(
    snapshot: &ReconciliationSnapshot,
    category: Option<&str>,
    notes: Option<&str>,
) -> Option<Transaction> {
    if snapshot.is_balanced() {
        return None;
    }

    let mut tx = Transaction::new(
        Uuid::new_v4(),
        snapshot.account_id.clone(),
        snapshot.difference.abs(),
        snapshot.as_of_date,
    );
    tx.transaction_type = if snapshot.difference > Decimal::ZERO {
        TransactionType::Income
    } else {
        TransactionType::Expense
    };
    tx.description = Some(ADJUSTMENT_DESCRIPTION.to_string());
    tx.category = category.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string);
    tx.notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    tx.tags = ADJUSTMENT_TAGS.iter().map(|t| t.to_string()).collect();
    tx.ensure_fingerprint();

    tracing::info!(
        account_id = %snapshot.account_id,
        as_of = %snapshot.as_of_date,
        kind = %tx.transaction_type,
        "created reconciliation adjustment"
    );
    Some(tx)
}

/// Where a reconciliation session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    BalanceComputed,
    AdjustmentCreated,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::BalanceComputed => "balance computed",
            Self::AdjustmentCreated => "adjustment created",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One reconciliation of one account
///
/// `Idle -> BalanceComputed -> AdjustmentCreated | Closed`. A balanced
/// snapshot closes the session right away; at most one adjustment is ever
/// produced.
#[derive(Debug, Clone)]
pub struct ReconciliationSession {
    account_id: String,
    state: SessionState,
    snapshot: Option<ReconciliationSnapshot>,
}

impl ReconciliationSession {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            state: SessionState::Idle,
            snapshot: None,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&ReconciliationSnapshot> {
        self.snapshot.as_ref()
    }

    /// Compute (or recompute) the snapshot
    ///
    /// An unparseable statement balance leaves the session as it was.
    pub fn compute(
        &mut self,
        ledger: &impl LedgerReader,
        cutoff: NaiveDate,
        statement_balance: &str,
    ) -> Result<&ReconciliationSnapshot> {
        if !matches!(self.state, SessionState::Idle | SessionState::BalanceComputed) {
            return Err(Error::reconciliation(format!(
                "cannot compute a balance, session is {}",
                self.state
            )));
        }

        let statement_balance = parse_statement_balance(statement_balance)?;
        let snapshot =
            ReconciliationEngine::new(ledger).reconcile(&self.account_id, cutoff, statement_balance)?;

        self.state = if snapshot.is_balanced() {
            SessionState::Closed
        } else {
            SessionState::BalanceComputed
        };
        Ok(&*self.snapshot.insert(snapshot))
    }

    /// Accept the computed difference, producing the adjustment
    pub fn accept(&mut self, category: Option<&str>, notes: Option<&str>) -> Result<Transaction> {
        if self.state != SessionState::BalanceComputed {
            return Err(Error::reconciliation(format!(
                "cannot accept, session is {}",
                self.state
            )));
        }
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::reconciliation("no snapshot computed"))?;
        let adjustment = adjustment_for(snapshot, category, notes)
            .ok_or_else(|| Error::reconciliation("snapshot is balanced, nothing to adjust"))?;

        self.state = SessionState::AdjustmentCreated;
        Ok(adjustment)
    }

    /// Close without an adjustment
    pub fn cancel(&mut self) -> Result<()> {
        if self.state == SessionState::AdjustmentCreated {
            return Err(Error::reconciliation("adjustment already created"));
        }
        self.state = SessionState::Closed;
        Ok(())
    }
}
