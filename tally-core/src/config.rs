//! Configuration management
//!
//! Settings live in `<tally_dir>/settings.json`:
//! ```json
//! {
//!   "app": { ... },
//!   "import": { "duplicateThreshold": 0.85, "ledgerWindowDays": 3, ... },
//!   "importProfiles": { "profiles": { "Chase": { ... } } }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{DayMonthOrder, ImportProfile};

pub const SETTINGS_FILE: &str = "settings.json";

const THRESHOLD_ENV: &str = "TALLY_DUPLICATE_THRESHOLD";
const WINDOW_ENV: &str = "TALLY_LEDGER_WINDOW_DAYS";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    import_profiles: ImportProfilesContainer,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportProfilesContainer {
    #[serde(default)]
    profiles: BTreeMap<String, ImportProfile>,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

fn default_threshold() -> f64 {
    0.85
}

fn default_window_days() -> i64 {
    3
}

fn default_batch_warning_rows() -> usize {
    2000
}

/// Import pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// Composite similarity (0..1) at or above which a pair is a duplicate
    #[serde(default = "default_threshold")]
    pub duplicate_threshold: f64,
    /// Ledger transactions this many days either side of a candidate are compared
    #[serde(default = "default_window_days")]
    pub ledger_window_days: i64,
    /// Batches above this size get a slow-scan warning
    #[serde(default = "default_batch_warning_rows")]
    pub batch_warning_rows: usize,
    #[serde(default)]
    pub default_date_order: DayMonthOrder,
    /// External catalog merged over the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_threshold(),
            ledger_window_days: default_window_days(),
            batch_warning_rows: default_batch_warning_rows(),
            default_date_order: DayMonthOrder::default(),
            catalog_path: None,
        }
    }
}

impl ImportSettings {
    /// Threshold as a decimal, parsed from its shortest text form so 0.85 stays exactly 0.85
    pub fn threshold_decimal(&self) -> Result<Decimal> {
        Decimal::from_str(&self.duplicate_threshold.to_string())
            .map_err(|_| Error::config(format!("invalid duplicate threshold {}", self.duplicate_threshold)))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(Error::config(format!(
                "duplicateThreshold must be between 0 and 1, got {}",
                self.duplicate_threshold
            )));
        }
        if self.ledger_window_days < 0 {
            return Err(Error::config(format!(
                "ledgerWindowDays cannot be negative, got {}",
                self.ledger_window_days
            )));
        }
        Ok(())
    }
}

/// Tally configuration (the parts of settings.json this crate manages)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
    pub import_profiles: BTreeMap<String, ImportProfile>,
    // Keep the raw settings for preservation when saving
    raw: SettingsFile,
}

impl Config {
    pub fn settings_path(tally_dir: &Path) -> PathBuf {
        tally_dir.join(SETTINGS_FILE)
    }

    /// Load config from the tally directory, applying environment overrides
    ///
    /// Overrides (for CI/testing): `TALLY_DUPLICATE_THRESHOLD`,
    /// `TALLY_LEDGER_WINDOW_DAYS`.
    pub fn load(tally_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(&Self::settings_path(tally_dir))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.import.validate()?;
        Ok(config)
    }

    /// Load a settings file without environment overrides
    pub fn load_file(settings_path: &Path) -> Result<Self> {
        let raw = read_settings(settings_path)?;
        Ok(Self {
            import: raw.import.clone(),
            import_profiles: raw.import_profiles.profiles.clone(),
            raw,
        })
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(THRESHOLD_ENV) {
            self.import.duplicate_threshold = value
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{} is not a number: {}", THRESHOLD_ENV, value)))?;
        }
        if let Some(value) = lookup(WINDOW_ENV) {
            self.import.ledger_window_days = value
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{} is not an integer: {}", WINDOW_ENV, value)))?;
        }
        Ok(())
    }

    /// Save config to the tally directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, tally_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(tally_dir)?;
        let settings_path = Self::settings_path(tally_dir);

        // Re-read so concurrent edits to unmanaged keys survive
        let mut settings = match read_settings(&settings_path) {
            Ok(settings) => settings,
            Err(_) => self.raw.clone(),
        };

        settings.import = self.import.clone();
        settings.import_profiles.profiles = self.import_profiles.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(SettingsFile::default());
    }
    serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("{} is not valid: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFormat;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_file(&Config::settings_path(dir.path())).unwrap();
        assert_eq!(config.import, ImportSettings::default());
        assert_eq!(config.import.threshold_decimal().unwrap(), Decimal::new(85, 2));
        assert!(config.import_profiles.is_empty());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = Config::settings_path(dir.path());
        std::fs::write(
            &path,
            r#"{"app":{"theme":"dark"},"importProfiles":{"accountMappings":{"a":"b"}},"import":{"ledgerWindowDays":5}}"#,
        )
        .unwrap();

        let mut config = Config::load_file(&path).unwrap();
        assert_eq!(config.import.ledger_window_days, 5);
        assert_eq!(config.import.duplicate_threshold, 0.85);

        config
            .import_profiles
            .insert("Bank".to_string(), ImportProfile::new("Bank", SourceFormat::Csv));
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["importProfiles"]["accountMappings"]["a"], "b");
        assert_eq!(saved["importProfiles"]["profiles"]["Bank"]["name"], "Bank");
        assert_eq!(saved["import"]["ledgerWindowDays"], 5);

        let reloaded = Config::load_file(&path).unwrap();
        assert!(reloaded.import_profiles.contains_key("Bank"));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "TALLY_DUPLICATE_THRESHOLD" => Some("0.9".to_string()),
                "TALLY_LEDGER_WINDOW_DAYS" => Some(" 7 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.import.duplicate_threshold, 0.9);
        assert_eq!(config.import.ledger_window_days, 7);

        let bad = config.apply_overrides(|_| Some("lots".to_string()));
        assert!(matches!(bad, Err(Error::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = ImportSettings::default();
        assert!(settings.validate().is_ok());

        settings.duplicate_threshold = 1.5;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        settings.duplicate_threshold = 0.85;
        settings.ledger_window_days = -1;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_settings_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(Config::settings_path(dir.path()), "{ not json").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::Config(_))));
    }
}
