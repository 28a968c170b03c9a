//! Column mapping: profiles resolved against records, the bank catalog and
//! header-based column detection

mod catalog;
mod detect;
mod mapper;

pub use catalog::{BankCatalog, BankEntry, InstitutionKind, ProfileTemplate};
pub use detect::{detect_columns, DetectedColumns};
pub use mapper::{select, ColumnMapper, MappedFields};
