//! Profile store over settings.json
//!
//! Profiles live under `importProfiles.profiles`; every other setting is
//! left untouched on write.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::domain::result::Result;
use crate::domain::ImportProfile;
use crate::ports::ProfileStore;

pub struct SettingsProfileStore {
    tally_dir: PathBuf,
}

impl SettingsProfileStore {
    pub fn new(tally_dir: &Path) -> Self {
        Self {
            tally_dir: tally_dir.to_path_buf(),
        }
    }

    fn load(&self) -> Result<Config> {
        Config::load_file(&Config::settings_path(&self.tally_dir))
    }
}

impl ProfileStore for SettingsProfileStore {
    fn get_profile(&self, name: &str) -> Result<Option<ImportProfile>> {
        let config = self.load()?;
        Ok(config
            .import_profiles
            .get(&ImportProfile::normalize_name(name))
            .cloned())
    }

    fn save_profile(&mut self, profile: &ImportProfile) -> Result<()> {
        let mut config = self.load()?;
        config
            .import_profiles
            .insert(ImportProfile::normalize_name(&profile.name), profile.clone());
        config.save(&self.tally_dir)
    }

    fn list_profiles(&self) -> Result<Vec<ImportProfile>> {
        Ok(self.load()?.import_profiles.into_values().collect())
    }

    fn delete_profile(&mut self, name: &str) -> Result<bool> {
        let mut config = self.load()?;
        let removed = config
            .import_profiles
            .remove(&ImportProfile::normalize_name(name))
            .is_some();
        if removed {
            config.save(&self.tally_dir)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFormat;
    use tempfile::TempDir;

    #[test]
    fn test_profiles_persist_in_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            Config::settings_path(dir.path()),
            r#"{"app":{"theme":"dark"}}"#,
        )
        .unwrap();

        let mut store = SettingsProfileStore::new(dir.path());
        store
            .save_profile(&ImportProfile::new("My Bank", SourceFormat::Csv))
            .unwrap();

        let store = SettingsProfileStore::new(dir.path());
        let profile = store.get_profile("My Bank").unwrap().unwrap();
        assert_eq!(profile.source_format, SourceFormat::Csv);
        assert_eq!(store.list_profiles().unwrap().len(), 1);

        let raw = std::fs::read_to_string(Config::settings_path(dir.path())).unwrap();
        assert!(raw.contains("\"theme\": \"dark\""));
    }

    #[test]
    fn test_delete_profile() {
        let dir = TempDir::new().unwrap();
        let mut store = SettingsProfileStore::new(dir.path());
        store
            .save_profile(&ImportProfile::new("Temp", SourceFormat::Qif))
            .unwrap();

        assert!(store.delete_profile("Temp").unwrap());
        assert!(store.get_profile("Temp").unwrap().is_none());
        assert!(!store.delete_profile("Temp").unwrap());
    }
}
