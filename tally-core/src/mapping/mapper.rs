//! Column mapper
//!
//! Resolves a profile's selectors against one raw record, producing the
//! still-unnormalized canonical fields.

use crate::domain::result::MappingError;
use crate::domain::{AmountSignConvention, CanonicalField, FieldSelector, ImportProfile};
use crate::formats::RawRecord;
use crate::normalize::RawAmount;

/// Canonical fields of one record, before date/amount normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedFields {
    pub date: String,
    pub amount: RawAmount,
    pub description: String,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub balance: Option<String>,
}

impl MappedFields {
    /// The direction field normalized to upper case, e.g. OFX `XFER`
    pub fn direction(&self) -> Option<String> {
        self.amount
            .direction
            .as_deref()
            .map(|d| d.trim().to_uppercase())
            .filter(|d| !d.is_empty())
    }
}

pub struct ColumnMapper;

impl ColumnMapper {
    /// Resolve every mapped field of `record`
    ///
    /// Required fields (date, some amount column, description when mapped)
    /// that do not resolve fail the record with a `MappingError`; optional
    /// ones come back as `None`.
    pub fn resolve(record: &RawRecord, profile: &ImportProfile) -> Result<MappedFields, MappingError> {
        let date = Self::required(record, profile, CanonicalField::Date)?;

        let amount = RawAmount {
            amount: Self::optional(record, profile, CanonicalField::Amount),
            debit: Self::optional(record, profile, CanonicalField::Debit),
            credit: Self::optional(record, profile, CanonicalField::Credit),
            direction: Self::optional(record, profile, CanonicalField::Direction),
        };

        if amount.amount.is_none() && amount.debit.is_none() && amount.credit.is_none() {
            let field = if profile.selector(CanonicalField::Amount).is_some() {
                CanonicalField::Amount
            } else if profile.selector(CanonicalField::Debit).is_some() {
                CanonicalField::Debit
            } else {
                CanonicalField::Credit
            };
            return Err(Self::missing(profile, field));
        }
        if profile.amount_sign_convention == AmountSignConvention::DirectionColumn
            && amount.direction.is_none()
        {
            return Err(Self::missing(profile, CanonicalField::Direction));
        }

        let description = match profile.selector(CanonicalField::Description) {
            Some(_) => Self::required(record, profile, CanonicalField::Description)?,
            None => String::new(),
        };

        let tags = Self::optional(record, profile, CanonicalField::Tags)
            .map(|raw| split_tags(&raw))
            .unwrap_or_default();

        Ok(MappedFields {
            date,
            amount,
            description,
            category: Self::non_empty(record, profile, CanonicalField::Category),
            notes: Self::non_empty(record, profile, CanonicalField::Notes),
            tags,
            balance: Self::non_empty(record, profile, CanonicalField::Balance),
        })
    }

    fn required(
        record: &RawRecord,
        profile: &ImportProfile,
        field: CanonicalField,
    ) -> Result<String, MappingError> {
        Self::optional(record, profile, field).ok_or_else(|| Self::missing(profile, field))
    }

    fn optional(record: &RawRecord, profile: &ImportProfile, field: CanonicalField) -> Option<String> {
        profile
            .selector(field)
            .and_then(|selector| select(record, selector))
            .map(|value| value.trim().to_string())
    }

    fn non_empty(record: &RawRecord, profile: &ImportProfile, field: CanonicalField) -> Option<String> {
        Self::optional(record, profile, field).filter(|v| !v.is_empty())
    }

    fn missing(profile: &ImportProfile, field: CanonicalField) -> MappingError {
        MappingError {
            field,
            selector: profile
                .selector(field)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "nothing".to_string()),
        }
    }
}

/// Look a selector up in a record
///
/// A fallback chain returns its first non-empty value, else its first
/// present (empty) value.
pub fn select<'a>(record: &'a RawRecord, selector: &FieldSelector) -> Option<&'a str> {
    match selector {
        FieldSelector::Index(index) => record.get_index(*index),
        FieldSelector::Name(name) => record.get(name),
        FieldSelector::FirstOf(chain) => {
            let mut first_present = None;
            for candidate in chain {
                if let Some(value) = select(record, candidate) {
                    if !value.trim().is_empty() {
                        return Some(value);
                    }
                    first_present.get_or_insert(value);
                }
            }
            first_present
        }
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';', '|'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
