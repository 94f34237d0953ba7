#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use household_core::{core::FixedClock, storage::JsonStorage};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a unique directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Storage backed by its own directory, retaining `retention` backups.
pub fn setup_storage(retention: usize) -> (JsonStorage, PathBuf) {
    let base = temp_base();
    let storage =
        JsonStorage::new(Some(base.clone()), Some(retention)).expect("create json storage backend");
    (storage, base)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn clock_at(y: i32, m: u32, d: u32) -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap())
}
