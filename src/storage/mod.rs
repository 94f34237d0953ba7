pub mod json_backend;

use std::path::Path;

use crate::{errors::Result, household::Household};

/// Abstraction over persistence backends capable of storing household documents and their
/// backups.
pub trait StorageBackend: Send + Sync {
    fn save(&self, household: &Household, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<Household>;
    fn exists(&self, name: &str) -> bool;
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    /// Writes a backup of `household` and returns the backup's file name.
    fn backup(&self, household: &Household, name: &str, note: Option<&str>) -> Result<String>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<Household>;

    /// Ad-hoc file operations outside the managed directory.
    fn save_to_path(&self, household: &Household, path: &Path) -> Result<()> {
        json_backend::save_household_to_path(household, path)
    }

    fn load_from_path(&self, path: &Path) -> Result<Household> {
        json_backend::load_household_from_path(path)
    }
}

pub use json_backend::{household_warnings, JsonStorage};
