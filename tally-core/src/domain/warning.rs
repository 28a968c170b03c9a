//! Normalization warnings
//!
//! Recorded in the import result; never abort an import.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NormalizationWarning {
    /// Date could not be parsed; the fallback date was used instead
    #[serde(rename_all = "camelCase")]
    DateFallback {
        row: usize,
        value: String,
        substituted: NaiveDate,
    },
    /// Amount parsed to zero; the row is kept
    #[serde(rename_all = "camelCase")]
    ZeroAmount { row: usize },
    /// Source was not valid UTF-8 and was read as ISO-8859-1
    NonUtf8Source,
    /// Batch is large enough that the pairwise duplicate scan is slow
    #[serde(rename_all = "camelCase")]
    LargeBatch { rows: usize, limit: usize },
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateFallback { row, value, substituted } => write!(
                f,
                "row {}: could not parse date '{}', used {}",
                row, value, substituted
            ),
            Self::ZeroAmount { row } => write!(f, "row {}: amount is zero", row),
            Self::NonUtf8Source => write!(f, "file is not UTF-8, decoded as ISO-8859-1"),
            Self::LargeBatch { rows, limit } => write!(
                f,
                "{} rows exceed the duplicate scan limit of {}; scan may be slow",
                rows, limit
            ),
        }
    }
}
