//! Field normalizers
//!
//! Turn raw strings pulled out of a statement into typed values: calendar
//! dates and signed decimal amounts.

pub mod amount;
mod date;

pub use amount::{parse_amount, RawAmount};
pub use date::{DateNormalizer, NormalizedDate};
