//! Projection of recurring planned transactions into future monthly instances.
//!
//! Projections are synthetic records: they are never persisted by this module and carry a
//! deterministic id so that repeated runs, or callers persisting them, cannot duplicate a
//! month.

use std::collections::HashSet;

use chrono::{Datelike, Months, NaiveDate};
use tracing::debug;

use super::Transaction;

const PROJECTION_SEPARATOR: char = '@';

/// Synthesizes the monthly instances of every recurrence source up to and including
/// `horizon`. Months already materialized for a source (any record whose `planned_id`
/// points at it in that month, including earlier projections) are skipped. Only newly
/// synthesized instances are returned, grouped by source in input order and chronological
/// within a source.
pub fn project(transactions: &[Transaction], horizon: NaiveDate) -> Vec<Transaction> {
    let materialized = materialized_months(transactions);
    let mut emitted: HashSet<String> = HashSet::new();
    let mut projected = Vec::new();

    for source in transactions.iter().filter(|t| t.is_recurrence_source()) {
        let before = projected.len();
        project_source(source, horizon, &materialized, &mut emitted, &mut projected);
        debug!(
            source = %source.id,
            generated = projected.len() - before,
            %horizon,
            "projected recurring transaction"
        );
    }

    projected
}

/// Deterministic id of the instance of `source_id` falling in `year`/`month`.
pub fn projection_id(source_id: &str, year: i32, month: u32) -> String {
    format!("{source_id}{PROJECTION_SEPARATOR}{year:04}-{month:02}")
}

/// Splits a projection id back into its source id, year and month.
pub fn parse_projection_id(id: &str) -> Option<(&str, i32, u32)> {
    let (source, stamp) = id.rsplit_once(PROJECTION_SEPARATOR)?;
    let (year, month) = stamp.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if source.is_empty() || !(1..=12).contains(&month) {
        return None;
    }
    Some((source, year, month))
}

/// Date of the `offset`-th monthly occurrence after `start`, clamped to the end of shorter
/// months. Anchoring on `start` keeps a 31st-of-month series from drifting.
pub fn occurrence_date(start: NaiveDate, offset: u32) -> Option<NaiveDate> {
    start.checked_add_months(Months::new(offset))
}

/// Last calendar day of `year`/`month`.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn project_source(
    source: &Transaction,
    horizon: NaiveDate,
    materialized: &HashSet<(&str, i32, u32)>,
    emitted: &mut HashSet<String>,
    out: &mut Vec<Transaction>,
) {
    // Ends at the horizon, the end date, or the last representable date.
    for offset in 1..=u32::MAX {
        let Some(date) = occurrence_date(source.date, offset) else {
            return;
        };
        if date > horizon {
            return;
        }
        if source.recurrence_end_date.is_some_and(|end| date > end) {
            return;
        }
        let (year, month) = (date.year(), date.month());
        if materialized.contains(&(source.id.as_str(), year, month)) {
            continue;
        }
        let id = projection_id(&source.id, year, month);
        if !emitted.insert(id.clone()) {
            continue;
        }
        out.push(Transaction {
            id,
            date,
            planned_id: Some(source.id.clone()),
            is_recurrent_projection: true,
            ..source.clone()
        });
    }
}

fn materialized_months(transactions: &[Transaction]) -> HashSet<(&str, i32, u32)> {
    transactions
        .iter()
        .filter_map(|txn| {
            txn.planned_id
                .as_deref()
                .map(|source| (source, txn.date.year(), txn.date.month()))
        })
        .collect()
}
