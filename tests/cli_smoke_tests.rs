mod common;

use std::path::Path;

use assert_cmd::Command;
use chrono::Utc;
use predicates::{prelude::PredicateBooleanExt, str::contains};

use household_core::config::{Config, ConfigManager};
use household_core::household::{ExpenseCategory, Transaction, TransactionCategory};
use household_core::storage::json_backend::{load_household_from_path, save_household_to_path};

const BIN_NAME: &str = "household_cli";

fn cli(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(BIN_NAME).expect("binary exists");
    cmd.env("HOUSEHOLD_CORE_HOME", home).env("NO_COLOR", "1");
    cmd
}

#[test]
fn version_prints_build_metadata() {
    let home = common::temp_base();
    cli(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(contains("household_core"));
}

#[test]
fn new_project_and_materialize_flow() {
    let home = common::temp_base();
    let file = home.join("demo.json");

    cli(&home)
        .args(["new", file.to_str().unwrap(), "Demo"])
        .assert()
        .success()
        .stdout(contains("Created"));

    let mut household = load_household_from_path(&file).unwrap();
    let today = Utc::now().date_naive();
    household.transactions.push(
        Transaction::planned(
            "Rent",
            900.0,
            TransactionCategory::Expense(ExpenseCategory::Housing),
            today,
        )
        .with_recurrence(None),
    );
    save_household_to_path(&household, &file).unwrap();

    cli(&home)
        .args(["project", file.to_str().unwrap(), "2"])
        .assert()
        .success()
        .stdout(contains("Rent"));

    cli(&home)
        .args(["materialize", file.to_str().unwrap(), "2"])
        .assert()
        .success()
        .stdout(contains("Materialized 2"))
        .stdout(contains("tracing initialized").not());

    let saved = load_household_from_path(&file).unwrap();
    assert_eq!(saved.transactions.len(), 3);
    assert!(home.join("backups").join("demo").is_dir());
}

#[test]
fn alerts_and_stock_on_empty_household() {
    let home = common::temp_base();
    let file = home.join("empty.json");
    cli(&home)
        .args(["new", file.to_str().unwrap(), "Empty"])
        .assert()
        .success();

    cli(&home)
        .args(["alerts", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("No alerts"));

    cli(&home)
        .args(["stock", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Stock"));
}

#[test]
fn summary_rejects_malformed_month() {
    let home = common::temp_base();
    let file = home.join("summary.json");
    cli(&home)
        .args(["new", file.to_str().unwrap(), "Summary"])
        .assert()
        .success();

    cli(&home)
        .args(["summary", file.to_str().unwrap(), "2024-13"])
        .assert()
        .failure()
        .stderr(contains("Error: invalid month"));

    cli(&home)
        .args(["summary", file.to_str().unwrap(), "2024-02"])
        .assert()
        .success()
        .stdout(contains("Summary 2024-02"));
}

#[test]
fn projections_use_configured_currency_and_locale() {
    let home = common::temp_base();
    let manager = ConfigManager::with_base_dir(home.clone()).unwrap();
    manager
        .save(&Config {
            locale: "de-DE".into(),
            currency: "EUR".into(),
            ..Config::default()
        })
        .unwrap();
    let file = home.join("euro.json");
    cli(&home)
        .args(["new", file.to_str().unwrap(), "Euro"])
        .assert()
        .success();

    let mut household = load_household_from_path(&file).unwrap();
    household.transactions.push(
        Transaction::planned(
            "Rent",
            1250.5,
            TransactionCategory::Expense(ExpenseCategory::Housing),
            Utc::now().date_naive(),
        )
        .with_recurrence(None),
    );
    save_household_to_path(&household, &file).unwrap();

    cli(&home)
        .args(["project", file.to_str().unwrap(), "1"])
        .assert()
        .success()
        .stdout(contains("EUR 1.250,50"));
}

#[test]
fn missing_file_reports_error() {
    let home = common::temp_base();
    cli(&home)
        .args(["stock", home.join("absent.json").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Error:"));
}
