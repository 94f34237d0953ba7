use chrono::{Duration, Utc};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{
    errors::{HouseholdError, Result},
    household::Household,
    utils::paths::{backups_dir_in, ensure_dir, households_dir_in, resolve_base, write_atomic},
};

use super::StorageBackend;

const FILE_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3f";
const BACKUP_TIMESTAMP_LEN: usize = 18;
const DEFAULT_RETENTION: usize = 5;

#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    households_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = resolve_base(root);
        ensure_dir(&app_root)?;
        let households_dir = households_dir_in(&app_root);
        let backups_dir = backups_dir_in(&app_root);
        ensure_dir(&households_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root: app_root,
            households_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn household_path(&self, name: &str) -> PathBuf {
        self.households_dir
            .join(format!("{}.{FILE_EXTENSION}", canonical_name(name)))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    /// Next free backup file name for `name`. Timestamps are bumped by a millisecond on
    /// collision so names stay unique and ordered.
    fn next_backup_name(&self, name: &str, note: Option<&str>) -> String {
        let dir = self.backup_dir(name);
        let label = sanitize_backup_note(note);
        let mut stamp = Utc::now();
        loop {
            let mut file_stem = format!(
                "{}_{}",
                canonical_name(name),
                stamp.format(BACKUP_TIMESTAMP_FORMAT)
            );
            if let Some(label) = label.as_deref() {
                file_stem.push('_');
                file_stem.push_str(label);
            }
            let file_name = format!("{file_stem}.{FILE_EXTENSION}");
            if !dir.join(&file_name).exists() {
                return file_name;
            }
            stamp += Duration::milliseconds(1);
        }
    }

    /// Copies the file currently stored at `path` into the backups of `name`.
    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        ensure_dir(&self.backup_dir(name))?;
        let backup_name = self.next_backup_name(name, None);
        fs::copy(path, self.backup_path(name, &backup_name))?;
        debug!(household = %name, backup = %backup_name, "previous version backed up");
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(self.backup_path(name, entry)) {
                warn!(backup = %entry, %err, "failed to prune backup");
            }
        }
        Ok(())
    }

    /// Writes `household` to an arbitrary path. A previous file at that path is backed up
    /// under its file stem first.
    pub fn save_to_path(&self, household: &Household, path: &Path) -> Result<()> {
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            self.backup_existing_file(stem, path)?;
        }
        save_household_to_path(household, path)
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, household: &Household, name: &str) -> Result<()> {
        let path = self.household_path(name);
        self.backup_existing_file(name, &path)?;
        save_household_to_path(household, &path)?;
        info!(household = %name, path = %path.display(), "household saved");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Household> {
        let path = self.household_path(name);
        if !path.exists() {
            return Err(HouseholdError::Storage(format!(
                "household `{name}` not found"
            )));
        }
        load_household_from_path(&path)
    }

    fn exists(&self, name: &str) -> bool {
        self.household_path(name).exists()
    }

    /// Backup file names for `name`, newest first.
    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                if backup_timestamp(file_name).is_some() {
                    entries.push(file_name.to_string());
                }
            }
        }
        entries.sort_by(|a, b| backup_timestamp(b).cmp(&backup_timestamp(a)));
        Ok(entries)
    }

    fn backup(&self, household: &Household, name: &str, note: Option<&str>) -> Result<String> {
        ensure_dir(&self.backup_dir(name))?;
        let backup_name = self.next_backup_name(name, note);
        let json = serde_json::to_string_pretty(household)?;
        write_atomic(&self.backup_path(name, &backup_name), &json)?;
        self.prune_backups(name)?;
        info!(household = %name, backup = %backup_name, "backup written");
        Ok(backup_name)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<Household> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(HouseholdError::Storage(format!(
                "backup `{backup_name}` not found"
            )));
        }
        let household = load_household_from_path(&backup_path)?;
        save_household_to_path(&household, &self.household_path(name))?;
        info!(household = %name, backup = %backup_name, "backup restored");
        Ok(household)
    }

    fn save_to_path(&self, household: &Household, path: &Path) -> Result<()> {
        JsonStorage::save_to_path(self, household, path)
    }
}

pub fn save_household_to_path(household: &Household, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(household)?;
    write_atomic(path, &json)
}

/// Reads a household document. Consistency problems are logged, not rejected.
pub fn load_household_from_path(path: &Path) -> Result<Household> {
    let data = fs::read_to_string(path)?;
    let household: Household = serde_json::from_str(&data)
        .map_err(|err| HouseholdError::Storage(format!("{}: {err}", path.display())))?;
    if household.schema_version > Household::schema_version_default() {
        return Err(HouseholdError::Storage(format!(
            "{} uses schema version {}, newer than supported",
            path.display(),
            household.schema_version
        )));
    }
    for warning in household_warnings(&household) {
        warn!(path = %path.display(), "{warning}");
    }
    Ok(household)
}

/// Reference and validation problems that do not prevent loading.
pub fn household_warnings(household: &Household) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    for txn in &household.transactions {
        if !seen.insert(txn.id.as_str()) {
            warnings.push(format!("duplicate transaction id {}", txn.id));
        }
        if let Some(planned_id) = txn.planned_id.as_deref() {
            if household.transaction(planned_id).is_none() {
                warnings.push(format!(
                    "transaction {} references unknown plan {planned_id}",
                    txn.id
                ));
            }
        }
        if let Err(err) = txn.validate() {
            warnings.push(format!("transaction {}: {err}", txn.id));
        }
    }
    for product in &household.products {
        if let Err(err) = product.validate() {
            warnings.push(format!("product {}: {err}", product.id));
        }
    }
    warnings
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "household".into()
    } else {
        sanitized
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Timestamp segment of a backup file name. Fixed width, so it orders chronologically.
fn backup_timestamp(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(&format!(".{FILE_EXTENSION}"))?;
    stem.split('_').rev().find(|segment| is_timestamp(segment))
}

fn is_timestamp(segment: &str) -> bool {
    segment.len() == BACKUP_TIMESTAMP_LEN
        && segment.char_indices().all(|(i, c)| {
            if i == 8 {
                c == 'T'
            } else {
                c.is_ascii_digit()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household::{
        ExpenseCategory, Product, Transaction, TransactionCategory, Unit,
    };
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn storage_with_temp_dir(retention: usize) -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(retention))
            .expect("json storage");
        (storage, temp)
    }

    fn sample_household() -> Household {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap();
        let mut household = Household::new("Sample", now);
        household.add_transaction(
            Transaction::planned(
                "Rent",
                950.0,
                TransactionCategory::Expense(ExpenseCategory::Housing),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .with_recurrence(None),
            now,
        );
        household.add_product(Product::new("Flour", Unit::Kilogram, 1.5, 2.0, now), now);
        household
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir(3);
        let household = sample_household();
        storage.save(&household, "Family Home").expect("save household");
        assert!(storage.exists("family home"));
        let loaded = storage.load("Family Home").expect("load household");
        assert_eq!(loaded.name, "Sample");
        assert_eq!(loaded.transactions, household.transactions);
        assert_eq!(loaded.products, household.products);
    }

    #[test]
    fn repeated_saves_keep_only_retained_backups() {
        let (storage, _guard) = storage_with_temp_dir(3);
        let household = sample_household();
        for _ in 0..6 {
            storage.save(&household, "family").expect("save household");
        }
        let backups = storage.list_backups("family").expect("list backups");
        assert_eq!(backups.len(), 3);
    }

    #[test]
    fn restore_replaces_current_document() {
        let (storage, _guard) = storage_with_temp_dir(3);
        let mut household = sample_household();
        storage.save(&household, "family").unwrap();
        let backup = storage.backup(&household, "family", Some("Before cleanup")).unwrap();
        assert!(backup.ends_with("_before-cleanup.json"), "{backup}");

        household.products.clear();
        storage.save(&household, "family").unwrap();
        let restored = storage.restore("family", &backup).unwrap();
        assert_eq!(restored.products.len(), 1);
        assert_eq!(storage.load("family").unwrap().products.len(), 1);
    }

    #[test]
    fn loading_missing_household_fails() {
        let (storage, _guard) = storage_with_temp_dir(3);
        assert!(matches!(
            storage.load("nobody"),
            Err(HouseholdError::Storage(_))
        ));
    }

    #[test]
    fn warnings_flag_dangling_plan_links() {
        let mut household = sample_household();
        let mut orphan = Transaction::completed(
            "Gas",
            30.0,
            TransactionCategory::Expense(ExpenseCategory::Utilities),
            NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
        );
        orphan.planned_id = Some("gone".into());
        household.transactions.push(orphan);
        let warnings = household_warnings(&household);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unknown plan gone"));
    }

    #[test]
    fn backup_names_sort_by_timestamp() {
        assert_eq!(
            backup_timestamp("my_home_20240102T030405678_note.json"),
            Some("20240102T030405678")
        );
        assert!(backup_timestamp("my_home.json").is_none());
    }
}
