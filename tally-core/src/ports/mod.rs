//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The import and
//! reconciliation services depend only on these traits, never on a
//! concrete ledger or settings store.

mod ledger;
mod profile_store;

pub use ledger::{LedgerReader, LedgerWriter};
pub use profile_store::ProfileStore;
