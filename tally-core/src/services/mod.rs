//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case: importing a statement, scoring
//! duplicates, reconciling a balance, managing import profiles.

pub mod duplicate;
pub mod import;
mod profile;
pub mod reconciliation;

pub use duplicate::{score, score_breakdown, Comparable, DuplicateChecker, DuplicateScan, ScoreBreakdown};
pub use import::{FailedRow, ImportResult, ImportService, ImportStatistics, SkippedDuplicate};
pub use profile::{ProfileQuery, ProfileService, ProfileSource, ResolvedProfile};
pub use reconciliation::{
    adjustment_for, compute_snapshot, parse_statement_balance, ReconciliationEngine,
    ReconciliationSession, SessionState,
};
