//! Profile service - saved import profiles and profile resolution

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{ImportProfile, SourceFormat};
use crate::mapping::{detect_columns, BankCatalog};
use crate::ports::ProfileStore;

const DETECTED_PROFILE_NAME: &str = "detected";

/// How a profile for an import was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "camelCase")]
pub enum ProfileSource {
    /// Saved profile, by name
    Saved(String),
    /// Catalog entry named by the caller
    Bank(String),
    /// Catalog entry whose header signature matched the file
    Inferred(String),
    /// Format default for OFX/QIF
    FormatDefault,
    /// Column detection over the CSV headers
    Detected,
    /// Columns named by the caller
    Custom,
}

impl fmt::Display for ProfileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved(name) => write!(f, "saved profile '{}'", name),
            Self::Bank(key) => write!(f, "bank '{}'", key),
            Self::Inferred(key) => write!(f, "bank '{}' (matched headers)", key),
            Self::FormatDefault => write!(f, "format default"),
            Self::Detected => write!(f, "detected columns"),
            Self::Custom => write!(f, "custom columns"),
        }
    }
}

/// A profile chosen for one import
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub profile: ImportProfile,
    pub source: ProfileSource,
}

/// What the caller knows when picking a profile
#[derive(Debug, Clone, Copy)]
pub struct ProfileQuery<'a> {
    pub name: Option<&'a str>,
    pub bank_key: Option<&'a str>,
    pub format: SourceFormat,
    pub headers: &'a [String],
}

/// Profile service over a profile store
pub struct ProfileService<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get_profile(&self, name: &str) -> Result<Option<ImportProfile>> {
        self.store.get_profile(name)
    }

    /// Save a profile under its name
    ///
    /// Saving over an existing name keeps that profile's id and creation time.
    pub fn save_profile(&mut self, mut profile: ImportProfile) -> Result<ImportProfile> {
        profile.name = ImportProfile::normalize_name(&profile.name);
        profile.validate()?;

        if let Some(existing) = self.store.get_profile(&profile.name)? {
            profile.id = existing.id;
            profile.created_at = existing.created_at;
        }
        profile.updated_at = Utc::now();

        self.store.save_profile(&profile)?;
        tracing::debug!(name = %profile.name, "saved import profile");
        Ok(profile)
    }

    pub fn list_profiles(&self) -> Result<Vec<ImportProfile>> {
        let mut profiles = self.store.list_profiles()?;
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<bool> {
        self.store.delete_profile(name)
    }

    /// Pick the profile for an import
    ///
    /// Explicit name, then bank key, then a catalog header match, then the
    /// OFX/QIF default or CSV column detection.
    pub fn resolve_profile(&self, query: &ProfileQuery<'_>, catalog: &BankCatalog) -> Result<ResolvedProfile> {
        if let Some(name) = query.name {
            let profile = self
                .store
                .get_profile(name)?
                .ok_or_else(|| Error::not_found(format!("Import profile not found: {}", name)))?;
            return Ok(ResolvedProfile {
                source: ProfileSource::Saved(profile.name.clone()),
                profile,
            });
        }

        if let Some(key) = query.bank_key {
            return Ok(ResolvedProfile {
                profile: catalog.profile_for(key)?,
                source: ProfileSource::Bank(key.trim().to_string()),
            });
        }

        if query.format != SourceFormat::Csv {
            return Ok(ResolvedProfile {
                profile: ImportProfile::new(query.format.to_string().to_uppercase(), query.format),
                source: ProfileSource::FormatDefault,
            });
        }

        if let Some(entry) = catalog.infer_from_headers(query.headers) {
            tracing::debug!(bank = %entry.key, "matched bank by headers");
            return Ok(ResolvedProfile {
                profile: entry.to_profile(),
                source: ProfileSource::Inferred(entry.key.clone()),
            });
        }

        detect_columns(query.headers)
            .to_profile(DETECTED_PROFILE_NAME)
            .map(|profile| ResolvedProfile {
                profile,
                source: ProfileSource::Detected,
            })
            .ok_or_else(|| {
                Error::validation(
                    "could not detect date and amount columns; pass a profile, a bank or column names",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryProfileStore;
    use crate::domain::{AmountSignConvention, CanonicalField};

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn query<'a>(headers: &'a [String]) -> ProfileQuery<'a> {
        ProfileQuery {
            name: None,
            bank_key: None,
            format: SourceFormat::Csv,
            headers,
        }
    }

    #[test]
    fn test_save_keeps_identity_of_existing_name() {
        let mut service = ProfileService::new(MemoryProfileStore::new());
        let first = service
            .save_profile(ImportProfile::new(" My Bank ", SourceFormat::Csv))
            .unwrap();
        assert_eq!(first.name, "My Bank");

        let mut replacement = ImportProfile::new("My Bank", SourceFormat::Csv);
        replacement.amount_sign_convention = AmountSignConvention::Inverted;
        let second = service.save_profile(replacement).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(service.list_profiles().unwrap().len(), 1);
        assert_eq!(
            service.get_profile("My Bank").unwrap().unwrap().amount_sign_convention,
            AmountSignConvention::Inverted
        );

        assert!(service.delete_profile("My Bank").unwrap());
        assert!(!service.delete_profile("My Bank").unwrap());
    }

    #[test]
    fn test_save_rejects_invalid_profile() {
        let mut service = ProfileService::new(MemoryProfileStore::new());
        let mut profile = ImportProfile::new("broken", SourceFormat::Csv);
        profile.field_mapping.remove(&CanonicalField::Date);
        assert!(matches!(service.save_profile(profile), Err(Error::Validation(_))));
    }

    #[test]
    fn test_resolution_order() {
        let catalog = BankCatalog::builtin().unwrap();
        let mut service = ProfileService::new(MemoryProfileStore::new());
        service
            .save_profile(ImportProfile::new("Saved", SourceFormat::Csv))
            .unwrap();

        let chase = headers(&["Details", "Posting Date", "Description", "Amount", "Type", "Balance", "Check or Slip #"]);

        let by_name = service
            .resolve_profile(&ProfileQuery { name: Some("Saved"), bank_key: Some("amex"), ..query(&chase) }, &catalog)
            .unwrap();
        assert_eq!(by_name.source, ProfileSource::Saved("Saved".to_string()));

        let by_bank = service
            .resolve_profile(&ProfileQuery { bank_key: Some("amex"), ..query(&chase) }, &catalog)
            .unwrap();
        assert_eq!(by_bank.source, ProfileSource::Bank("amex".to_string()));

        let inferred = service.resolve_profile(&query(&chase), &catalog).unwrap();
        assert_eq!(inferred.source, ProfileSource::Inferred("chase_checking".to_string()));

        let generic = headers(&["Trans Date", "Memo", "Amt"]);
        let detected = service.resolve_profile(&query(&generic), &catalog).unwrap();
        assert_eq!(detected.source, ProfileSource::Detected);
        assert_eq!(detected.profile.name, "detected");

        let none = headers(&["When", "What"]);
        assert!(matches!(
            service.resolve_profile(&query(&none), &catalog),
            Err(Error::Validation(_))
        ));

        assert!(matches!(
            service.resolve_profile(&ProfileQuery { name: Some("missing"), ..query(&none) }, &catalog),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_ofx_uses_format_default() {
        let catalog = BankCatalog::builtin().unwrap();
        let service = ProfileService::new(MemoryProfileStore::new());
        let resolved = service
            .resolve_profile(&ProfileQuery { format: SourceFormat::Ofx, ..query(&[]) }, &catalog)
            .unwrap();
        assert_eq!(resolved.source, ProfileSource::FormatDefault);
        assert_eq!(resolved.profile.source_format, SourceFormat::Ofx);
    }

    #[test]
    fn test_qif_format_default_reads_month_first_dates() {
        use crate::config::ImportSettings;
        use crate::services::ImportService;
        use chrono::NaiveDate;

        let catalog = BankCatalog::builtin().unwrap();
        let service = ProfileService::new(MemoryProfileStore::new());
        let resolved = service
            .resolve_profile(&ProfileQuery { format: SourceFormat::Qif, ..query(&[]) }, &catalog)
            .unwrap();
        assert_eq!(resolved.source, ProfileSource::FormatDefault);

        let qif = "!Type:Bank\nD03/04/2024\nT-12.00\nPGrocer\n^\nD01/15/2024\nT100.00\nPPayroll\n^\n";
        let result = ImportService::new(&ImportSettings::default())
            .unwrap()
            .with_today(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
            .import_bytes(qif.as_bytes(), &resolved.profile, "checking", &[])
            .unwrap();

        assert_eq!(result.imported.len(), 2);
        assert_eq!(result.imported[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(result.imported[1].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert!(result.warnings.is_empty());
    }
}
