//! Plan-versus-actual totals for a calendar month.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::HouseholdError;
use crate::household::{month_end, project, Household, TransactionKind, TransactionStatus};

use super::{ServiceResult, TransactionService};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BudgetStatus {
    OnTrack,
    OverBudget,
    UnderBudget,
    Empty,
    /// Some planned lines of the month are still open.
    Incomplete,
}

/// Totals for one transaction kind within a month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KindTotals {
    /// Sum of every plan line of the month, settled or not.
    pub planned: f64,
    /// Sum of completed entries, planned or logged directly.
    pub actual: f64,
    /// Planned amount withdrawn through cancellations.
    pub cancelled: f64,
    /// Planned amount not yet completed or cancelled.
    pub outstanding: f64,
    pub variance: f64,
    pub percent_used: Option<f64>,
    pub status: BudgetStatus,
}

impl KindTotals {
    fn from_parts(planned: f64, actual: f64, cancelled: f64, outstanding: f64) -> Self {
        let budgeted = planned - cancelled;
        let variance = actual - budgeted;
        let percent_used = if budgeted.abs() > f64::EPSILON {
            Some((actual / budgeted) * 100.0)
        } else if actual.abs() > f64::EPSILON {
            Some(100.0)
        } else {
            None
        };
        let status = if outstanding > f64::EPSILON {
            BudgetStatus::Incomplete
        } else if budgeted.abs() < f64::EPSILON && actual.abs() < f64::EPSILON {
            BudgetStatus::Empty
        } else {
            match actual.partial_cmp(&budgeted).unwrap_or(Ordering::Equal) {
                Ordering::Greater => BudgetStatus::OverBudget,
                Ordering::Less => BudgetStatus::UnderBudget,
                Ordering::Equal => BudgetStatus::OnTrack,
            }
        };
        Self {
            planned,
            actual,
            cancelled,
            outstanding,
            variance,
            percent_used,
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub income: KindTotals,
    pub expense: KindTotals,
}

impl MonthlySummary {
    /// Completed income minus completed expenses.
    pub fn net_actual(&self) -> f64 {
        self.income.actual - self.expense.actual
    }

    pub fn net_planned(&self) -> f64 {
        let income = self.income.planned - self.income.cancelled;
        let expense = self.expense.planned - self.expense.cancelled;
        income - expense
    }
}

pub struct SummaryService;

impl SummaryService {
    /// Summarizes `year`-`month`, counting projected recurring entries as plan lines.
    pub fn month_summary(
        household: &Household,
        year: i32,
        month: u32,
    ) -> ServiceResult<MonthlySummary> {
        let end = month_end(year, month).ok_or_else(|| {
            HouseholdError::InvalidInput(format!("invalid month {year}-{month:02}"))
        })?;
        Ok(MonthlySummary {
            year,
            month,
            income: Self::kind_totals(household, TransactionKind::Income, year, month, end),
            expense: Self::kind_totals(household, TransactionKind::Expense, year, month, end),
        })
    }

    fn kind_totals(
        household: &Household,
        kind: TransactionKind,
        year: i32,
        month: u32,
        end: NaiveDate,
    ) -> KindTotals {
        let stored = household
            .transactions
            .iter()
            .filter(|txn| txn.kind() == kind && txn.month() == (year, month));
        let projected = project(&household.transactions, end);

        let mut lines = HashSet::new();
        let mut planned = 0.0;
        let mut actual = 0.0;
        let mut cancelled = 0.0;

        // Stored planned lines come first so a materialized month is counted once.
        for txn in stored.clone() {
            if txn.status == TransactionStatus::Planned && lines.insert(txn.plan_key()) {
                planned += txn.amount;
            }
        }
        let projected_in_month = projected
            .iter()
            .filter(|txn| txn.kind() == kind && txn.month() == (year, month));
        for txn in projected_in_month {
            if lines.insert(txn.plan_key()) {
                planned += txn.amount;
            }
        }
        for txn in stored {
            match txn.status {
                TransactionStatus::Completed => {
                    actual += txn.amount;
                    if txn.planned_id.is_some() && lines.insert(txn.plan_key()) {
                        planned += txn.planned_amount.unwrap_or(txn.amount);
                    }
                }
                TransactionStatus::Cancelled => {
                    let amount = txn.planned_amount.unwrap_or(txn.amount);
                    cancelled += amount;
                    if lines.insert(txn.plan_key()) {
                        planned += amount;
                    }
                }
                TransactionStatus::Planned => {}
            }
        }

        let outstanding: f64 = TransactionService::outstanding(household, end)
            .iter()
            .filter(|txn| txn.kind() == kind && txn.month() == (year, month))
            .map(|txn| txn.amount)
            .sum();

        KindTotals::from_parts(planned, actual, cancelled, outstanding)
    }
}
