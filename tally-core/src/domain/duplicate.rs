//! Duplicate match domain model

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::SourceRowRef;

/// A field that contributed its full weight to a similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchField {
    Date,
    Amount,
    Description,
    Account,
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Description => "description",
            Self::Account => "account",
        };
        write!(f, "{}", name)
    }
}

/// A candidate judged to duplicate a ledger transaction or an earlier row
///
/// Exactly one of `existing_transaction_id` and `within_batch_ref` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub candidate_ref: SourceRowRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_transaction_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within_batch_ref: Option<SourceRowRef>,
    /// 0 to 100
    pub similarity: Decimal,
    pub matched_fields: Vec<MatchField>,
}

impl DuplicateMatch {
    pub fn is_ledger_match(&self) -> bool {
        self.existing_transaction_id.is_some()
    }
}
