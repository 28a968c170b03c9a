//! Adapters - concrete implementations of the ports
//!
//! - `memory`: in-memory ledger and profile store
//! - `json_ledger`: ledger persisted as one JSON file
//! - `settings_store`: profiles persisted in settings.json

pub mod json_ledger;
pub mod memory;
pub mod settings_store;

pub use json_ledger::{JsonLedger, LEDGER_FILE};
pub use memory::{MemoryLedger, MemoryProfileStore};
pub use settings_store::SettingsProfileStore;
