//! Alert evaluation for scheduled jobs. Delivery belongs to the caller.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::core::time::Clock;
use crate::household::{decay, stock::depletion_estimate, Household, Transaction, Unit};

use super::TransactionService;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DueStatus {
    Overdue,
    DueSoon,
}

impl DueStatus {
    fn classify(scheduled: NaiveDate, today: NaiveDate) -> DueStatus {
        if scheduled < today {
            DueStatus::Overdue
        } else {
            DueStatus::DueSoon
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DueAlert {
    pub transaction: Transaction,
    /// Negative for overdue entries.
    pub due_in_days: i64,
    pub status: DueStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub product_id: String,
    pub name: String,
    pub stock: f64,
    pub unit: Unit,
    pub depleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depletion_estimate: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    pub generated_at: DateTime<Utc>,
    pub due: Vec<DueAlert>,
    pub low_stock: Vec<StockAlert>,
}

impl AlertReport {
    pub fn is_empty(&self) -> bool {
        self.due.is_empty() && self.low_stock.is_empty()
    }
}

pub struct AlertService;

impl AlertService {
    /// Open plan lines, projections included, dated within `overdue_days` before `today`
    /// and `days` after it.
    pub fn due_transactions(
        household: &Household,
        today: NaiveDate,
        overdue_days: u32,
        days: u32,
    ) -> Vec<DueAlert> {
        let horizon = today
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        let oldest = today
            .checked_sub_signed(Duration::days(i64::from(overdue_days)))
            .unwrap_or(NaiveDate::MIN);
        TransactionService::outstanding(household, horizon)
            .into_iter()
            .filter(|transaction| transaction.date >= oldest)
            .map(|transaction| DueAlert {
                due_in_days: (transaction.date - today).num_days(),
                status: DueStatus::classify(transaction.date, today),
                transaction,
            })
            .collect()
    }

    /// Products whose decayed stock is at or below `threshold`, lowest first.
    pub fn low_stock(household: &Household, now: DateTime<Utc>, threshold: f64) -> Vec<StockAlert> {
        let mut alerts: Vec<StockAlert> = household
            .products
            .iter()
            .filter_map(|product| {
                let decayed = decay(product, now);
                (decayed.current_stock <= threshold).then(|| StockAlert {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    stock: decayed.current_stock,
                    unit: product.unit,
                    depleted: decayed.current_stock <= 0.0,
                    depletion_estimate: depletion_estimate(product, 0.0),
                })
            })
            .collect();
        alerts.sort_by(|a, b| a.stock.total_cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        alerts
    }

    pub fn evaluate(household: &Household, clock: &dyn Clock, config: &Config) -> AlertReport {
        let now = clock.now();
        let report = AlertReport {
            generated_at: now,
            due: Self::due_transactions(
                household,
                clock.today(),
                config.overdue_days,
                config.due_soon_days,
            ),
            low_stock: Self::low_stock(household, now, config.low_stock_threshold),
        };
        info!(
            due = report.due.len(),
            low_stock = report.low_stock.len(),
            "alerts evaluated"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::household::{
        ConsumptionPeriod, ExpenseCategory, Product, TransactionCategory,
    };
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap())
    }

    fn household() -> Household {
        let mut household = Household::new("Home", clock().0);
        household.add_transaction(
            Transaction::planned(
                "Internet",
                40.0,
                TransactionCategory::Expense(ExpenseCategory::Utilities),
                date(2024, 1, 14),
            )
            .with_recurrence(None),
            clock().0,
        );
        household.add_transaction(
            Transaction::planned(
                "Dentist",
                90.0,
                TransactionCategory::Expense(ExpenseCategory::Healthcare),
                date(2024, 3, 8),
            ),
            clock().0,
        );
        household
    }

    #[test]
    fn due_window_includes_projections_and_recent_overdue_lines() {
        let household = household();
        let alerts = AlertService::due_transactions(&household, date(2024, 3, 10), 31, 7);
        let summary: Vec<_> = alerts
            .iter()
            .map(|a| (a.transaction.date, a.due_in_days, a.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                (date(2024, 2, 14), -25, DueStatus::Overdue),
                (date(2024, 3, 8), -2, DueStatus::Overdue),
                (date(2024, 3, 14), 4, DueStatus::DueSoon),
            ]
        );
        assert!(alerts[2].transaction.is_recurrent_projection);
    }

    #[test]
    fn unsettled_history_does_not_grow_the_due_list() {
        let mut household = Household::new("Home", clock().0);
        household.add_transaction(
            Transaction::planned(
                "Gym",
                30.0,
                TransactionCategory::Expense(ExpenseCategory::Other),
                date(2022, 1, 1),
            )
            .with_recurrence(None),
            clock().0,
        );
        household.add_transaction(
            Transaction::completed(
                "Gym",
                30.0,
                TransactionCategory::Expense(ExpenseCategory::Other),
                date(2024, 1, 2),
            ),
            clock().0,
        );

        let alerts = AlertService::due_transactions(&household, date(2024, 1, 10), 31, 7);
        let dates: Vec<_> = alerts.iter().map(|a| a.transaction.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1)]);

        let none_overdue = AlertService::due_transactions(&household, date(2024, 1, 10), 0, 7);
        assert!(none_overdue.is_empty());
    }

    #[test]
    fn low_stock_uses_decayed_levels() {
        let mut household = Household::new("Home", clock().0);
        let started = clock().0 - Duration::days(3);
        household.add_product(
            Product::new("Bread", Unit::Piece, 2.0, 2.0, started)
                .with_consumption(1.0, ConsumptionPeriod::Daily),
            started,
        );
        household.add_product(Product::new("Rice", Unit::Kilogram, 3.0, 5.0, started), started);

        let alerts = AlertService::low_stock(&household, clock().0, 1.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].name, "Bread");
        assert!(alerts[0].depleted);
        assert_eq!(alerts[0].depletion_estimate, Some(started + Duration::days(2)));
    }

    #[test]
    fn evaluate_reads_windows_from_config() {
        let household = household();
        let config = Config {
            due_soon_days: 3,
            ..Config::default()
        };
        let report = AlertService::evaluate(&household, &clock(), &config);
        assert_eq!(report.due.len(), 2);
        assert!(report.low_stock.is_empty());
        assert!(!report.is_empty());
    }
}
