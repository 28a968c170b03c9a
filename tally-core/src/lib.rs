//! Tally Core - statement import and reconciliation for personal finance
//!
//! This crate implements the import pipeline following hexagonal architecture:
//!
//! - **domain**: Core entities (Transaction, CandidateTransaction, ImportProfile, etc.)
//! - **formats**: CSV, OFX and QIF parsers producing uniform raw records
//! - **normalize**: Date and amount normalizers
//! - **mapping**: Column mapper, bank catalog and column detection
//! - **ports**: Trait definitions for external collaborators (ledger, profile store)
//! - **services**: Import orchestration, duplicate checking, reconciliation
//! - **adapters**: Concrete implementations (in-memory, JSON ledger, settings.json)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod formats;
pub mod logging;
pub mod mapping;
pub mod normalize;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};

use adapters::{JsonLedger, SettingsProfileStore, LEDGER_FILE};
use config::Config;
use mapping::BankCatalog;
use services::{ImportService, ProfileService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{
    Account, CandidateTransaction, DuplicateMatch, ImportProfile, NormalizationWarning,
    ReconciliationSnapshot, SourceFormat, Transaction, TransactionType,
};

/// Main context for Tally operations
///
/// Holds the configuration, the bank catalog and the services wired to
/// the files under one tally directory.
pub struct TallyContext {
    pub tally_dir: PathBuf,
    pub config: Config,
    pub catalog: BankCatalog,
    pub import_service: ImportService,
    pub profile_service: ProfileService<SettingsProfileStore>,
}

impl TallyContext {
    /// Create a new Tally context
    pub fn new(tally_dir: &Path) -> Result<Self> {
        let config = Config::load(tally_dir)?;
        let catalog = BankCatalog::load(config.import.catalog_path.as_deref())?;
        let import_service = ImportService::new(&config.import)?;
        let profile_service = ProfileService::new(SettingsProfileStore::new(tally_dir));

        Ok(Self {
            tally_dir: tally_dir.to_path_buf(),
            config,
            catalog,
            import_service,
            profile_service,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.tally_dir.join(LEDGER_FILE)
    }

    /// Open the JSON ledger in the tally directory
    pub fn open_ledger(&self) -> Result<JsonLedger> {
        JsonLedger::open(&self.ledger_path())
    }
}
