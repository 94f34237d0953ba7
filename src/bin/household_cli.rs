use std::{env, path::PathBuf, process};

use chrono::{Months, NaiveDate};
use colored::Colorize;

use household_core::{
    config::{Config, ConfigManager},
    core::{
        services::{AlertService, DueStatus, ProductService, SummaryService, TransactionService},
        Clock, SystemClock,
    },
    household::{project, Displayable, Household, Transaction},
    init,
    storage::{JsonStorage, StorageBackend},
    utils::build_info,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let mut args = env::args().skip(1);
    let command = args.next().unwrap_or_else(|| usage_exit());

    if command == "version" {
        println!("{}", build_info::current().summary());
        return Ok(());
    }

    let config = ConfigManager::new()?.load()?;
    let storage = JsonStorage::new(None, Some(config.backup_retention))?;
    let clock = SystemClock;
    let path = args.next().map(PathBuf::from).unwrap_or_else(|| usage_exit());

    match command.as_str() {
        "new" => {
            let name = args.next().unwrap_or_else(|| usage_exit());
            if path.exists() {
                return Err(format!("{} already exists", path.display()).into());
            }
            let household = Household::new(name, clock.now());
            storage.save_to_path(&household, &path)?;
            println!(
                "{} household `{}` at {}",
                "Created".green(),
                household.name,
                path.display()
            );
        }
        "project" => {
            let household = storage.load_from_path(&path)?;
            let horizon = horizon(&clock, months_arg(args.next(), &config)?)?;
            let projected = project(&household.transactions, horizon);
            println!("{} up to {horizon}", "Projections".bold());
            if projected.is_empty() {
                println!("  none");
            }
            for txn in &projected {
                print_transaction(txn, &config);
            }
        }
        "materialize" => {
            let mut household = storage.load_from_path(&path)?;
            let horizon = horizon(&clock, months_arg(args.next(), &config)?)?;
            let created = TransactionService::materialize_projections(&mut household, horizon, &clock);
            storage.save_to_path(&household, &path)?;
            println!(
                "{} {} projected transaction(s) up to {horizon}",
                "Materialized".green(),
                created.len()
            );
        }
        "stock" => {
            let household = storage.load_from_path(&path)?;
            println!("{}", "Stock".bold());
            for product in ProductService::stock_levels(&household, &clock) {
                let label = product.display_label();
                if product.current_stock <= config.low_stock_threshold {
                    println!("  {}", label.red());
                } else {
                    println!("  {label}");
                }
            }
        }
        "alerts" => {
            let household = storage.load_from_path(&path)?;
            let report = AlertService::evaluate(&household, &clock, &config);
            if report.is_empty() {
                println!("No alerts");
                return Ok(());
            }
            for alert in &report.due {
                let label = match alert.status {
                    DueStatus::Overdue => "OVERDUE".red(),
                    DueStatus::DueSoon => "DUE".yellow(),
                };
                println!(
                    "{label} {} {} {} (in {} day(s))",
                    alert.transaction.date,
                    alert.transaction.description,
                    config.format_amount(alert.transaction.amount),
                    alert.due_in_days
                );
            }
            for alert in &report.low_stock {
                let label = if alert.depleted {
                    "OUT".red()
                } else {
                    "LOW".yellow()
                };
                println!("{label} {} {:.2} {}", alert.name, alert.stock, alert.unit);
            }
        }
        "summary" => {
            let household = storage.load_from_path(&path)?;
            let raw = args.next().unwrap_or_else(|| usage_exit());
            let (year, month) = parse_month(&raw)?;
            let summary = SummaryService::month_summary(&household, year, month)?;
            println!("{} {year}-{month:02}", "Summary".bold());
            for (label, totals) in [("Income", &summary.income), ("Expense", &summary.expense)] {
                println!(
                    "  {label:<8} planned {}  actual {}  cancelled {}  outstanding {}  {:?}",
                    config.format_amount(totals.planned),
                    config.format_amount(totals.actual),
                    config.format_amount(totals.cancelled),
                    config.format_amount(totals.outstanding),
                    totals.status
                );
            }
            println!("  Net      {}", config.format_amount(summary.net_actual()));
        }
        _ => usage_exit(),
    }

    Ok(())
}

fn print_transaction(txn: &Transaction, config: &Config) {
    println!(
        "  {} {} {} ({}) {}",
        txn.date,
        txn.description,
        config.format_amount(txn.amount),
        txn.category,
        txn.id.dimmed()
    );
}

fn months_arg(raw: Option<String>, config: &Config) -> CliResult<u32> {
    match raw {
        Some(value) => Ok(value
            .parse::<u32>()
            .map_err(|_| format!("invalid month count `{value}`"))?),
        None => Ok(config.projection_months),
    }
}

fn horizon(clock: &dyn Clock, months: u32) -> CliResult<NaiveDate> {
    clock
        .today()
        .checked_add_months(Months::new(months))
        .ok_or_else(|| format!("horizon of {months} months is out of range").into())
}

fn parse_month(raw: &str) -> CliResult<(i32, u32)> {
    let invalid = || format!("invalid month `{raw}`, expected YYYY-MM");
    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month.parse::<u32>().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid().into());
    }
    Ok((year, month))
}

fn usage_exit() -> ! {
    eprintln!(
        "Usage: household_cli <command>\n\
         Commands:\n  \
         new <file.json> <name>\n  \
         project <file.json> [months]\n  \
         materialize <file.json> [months]\n  \
         stock <file.json>\n  \
         alerts <file.json>\n  \
         summary <file.json> <YYYY-MM>\n  \
         version"
    );
    process::exit(1);
}
