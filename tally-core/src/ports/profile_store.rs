//! Profile storage port - key/value persistence of import profiles

use crate::domain::result::Result;
use crate::domain::ImportProfile;

/// Import profiles keyed by name
pub trait ProfileStore {
    fn get_profile(&self, name: &str) -> Result<Option<ImportProfile>>;

    /// Insert or replace the profile stored under `profile.name`
    fn save_profile(&mut self, profile: &ImportProfile) -> Result<()>;

    fn list_profiles(&self) -> Result<Vec<ImportProfile>>;

    /// Returns whether a profile was removed
    fn delete_profile(&mut self, name: &str) -> Result<bool>;
}
