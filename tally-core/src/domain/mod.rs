//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod candidate;
mod duplicate;
pub mod profile;
pub mod reconciliation;
pub mod result;
mod transaction;
mod warning;

pub use account::Account;
pub use candidate::{CandidateTransaction, SourceRowRef};
pub use duplicate::{DuplicateMatch, MatchField};
pub use profile::{
    AmountSignConvention, CanonicalField, DayMonthOrder, FieldSelector, ImportProfile, SourceFormat,
};
pub use reconciliation::{ReconciliationSnapshot, ADJUSTMENT_EPSILON, ADJUSTMENT_TAGS};
pub use transaction::{calculate_fingerprint, normalize_description, Transaction, TransactionType};
pub use warning::NormalizationWarning;
