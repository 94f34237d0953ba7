//! Stock decay between observations.

use chrono::{DateTime, Datelike, Months, Utc};

use super::{ConsumptionPeriod, Product};

/// Length of a `half-monthly` period. A fixed block, not a calendar half-month.
pub const HALF_MONTH_DAYS: i64 = 14;

/// Returns `product` with its stock reduced by the consumption accrued between its
/// `last_updated` timestamp and `now`, clamped at zero. Products without a complete,
/// positive consumption profile come back unchanged. `last_updated` is left untouched;
/// persisting the decayed value is the caller's decision.
pub fn decay(product: &Product, now: DateTime<Utc>) -> Product {
    let (Some(rate), Some(period), Some(last_updated)) = (
        product.consumption_rate,
        product.consumption_period,
        product.last_updated,
    ) else {
        return product.clone();
    };
    if !rate.is_finite() || rate <= 0.0 {
        return product.clone();
    }

    let periods = periods_passed(period, last_updated, now);
    if periods <= 0 {
        return product.clone();
    }

    let consumed = periods as f64 * rate;
    Product {
        current_stock: (product.current_stock - consumed).max(0.0),
        ..product.clone()
    }
}

/// Whole `period`s elapsed from `from` to `now`; zero when `now` is not after `from`.
pub fn periods_passed(period: ConsumptionPeriod, from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    if now <= from {
        return 0;
    }
    let elapsed = now - from;
    match period {
        ConsumptionPeriod::Daily => elapsed.num_days(),
        ConsumptionPeriod::Weekly => elapsed.num_weeks(),
        ConsumptionPeriod::HalfMonthly => elapsed.num_days() / HALF_MONTH_DAYS,
        ConsumptionPeriod::Monthly => whole_months_between(from, now),
    }
}

/// Estimated date on which decay brings the stock down to `threshold`, assuming the
/// current profile holds. `None` when the product does not decay.
pub fn depletion_estimate(product: &Product, threshold: f64) -> Option<DateTime<Utc>> {
    let rate = product.consumption_rate.filter(|r| r.is_finite() && *r > 0.0)?;
    let period = product.consumption_period?;
    let last_updated = product.last_updated?;
    let surplus = product.current_stock - threshold.max(0.0);
    if surplus < 0.0 {
        return Some(last_updated);
    }
    let periods = (surplus / rate).ceil() as u32;
    advance(period, last_updated, periods)
}

/// `from` moved forward by `periods` whole periods.
pub fn advance(
    period: ConsumptionPeriod,
    from: DateTime<Utc>,
    periods: u32,
) -> Option<DateTime<Utc>> {
    let days = |n: i64| chrono::Duration::try_days(n).and_then(|d| from.checked_add_signed(d));
    match period {
        ConsumptionPeriod::Daily => days(i64::from(periods)),
        ConsumptionPeriod::Weekly => days(i64::from(periods) * 7),
        ConsumptionPeriod::HalfMonthly => days(i64::from(periods) * HALF_MONTH_DAYS),
        ConsumptionPeriod::Monthly => from.checked_add_months(Months::new(periods)),
    }
}

fn whole_months_between(from: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let mut months = i64::from(now.year() - from.year()) * 12 + i64::from(now.month())
        - i64::from(from.month());
    // The calendar difference overshoots by one when `now` falls earlier in its month.
    while months > 0 {
        let reached = u32::try_from(months)
            .ok()
            .and_then(|m| from.checked_add_months(Months::new(m)))
            .is_some_and(|candidate| candidate <= now);
        if reached {
            break;
        }
        months -= 1;
    }
    months.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::household::Unit;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn product(stock: f64, rate: f64, period: ConsumptionPeriod, since: DateTime<Utc>) -> Product {
        let mut p = Product::new("Milk", Unit::Liter, 1.1, stock, since)
            .with_consumption(rate, period);
        p.id = "p".into();
        p
    }

    #[test]
    fn daily_consumption_clamps_at_zero() {
        let start = at(2024, 5, 1);
        let p = product(2.0, 1.0, ConsumptionPeriod::Daily, start);
        let decayed = decay(&p, start + Duration::days(5));
        assert_eq!(decayed.current_stock, 0.0);
        assert_eq!(decayed.last_updated, p.last_updated);
    }

    #[test]
    fn partial_periods_do_not_count() {
        let start = at(2024, 5, 1);
        let p = product(10.0, 1.0, ConsumptionPeriod::Weekly, start);
        assert_eq!(decay(&p, start + Duration::days(13)).current_stock, 9.0);
        assert_eq!(decay(&p, start + Duration::days(6)), p);
    }

    #[test]
    fn half_month_is_a_fourteen_day_block() {
        let start = at(2024, 2, 1);
        let p = product(10.0, 2.0, ConsumptionPeriod::HalfMonthly, start);
        assert_eq!(decay(&p, start + Duration::days(13)).current_stock, 10.0);
        assert_eq!(decay(&p, start + Duration::days(14)).current_stock, 8.0);
        assert_eq!(decay(&p, at(2024, 2, 16)).current_stock, 8.0);
        assert_eq!(decay(&p, at(2024, 2, 29)).current_stock, 6.0);
    }

    #[test]
    fn monthly_uses_calendar_months() {
        let start = at(2024, 1, 31);
        let p = product(10.0, 3.0, ConsumptionPeriod::Monthly, start);
        assert_eq!(decay(&p, at(2024, 2, 28)).current_stock, 10.0);
        assert_eq!(decay(&p, at(2024, 2, 29)).current_stock, 7.0);
        assert_eq!(decay(&p, at(2024, 3, 31)).current_stock, 4.0);
    }

    #[test]
    fn missing_profile_is_a_no_op() {
        let start = at(2024, 1, 1);
        let mut p = product(3.0, 1.0, ConsumptionPeriod::Daily, start);
        p.consumption_rate = None;
        assert_eq!(decay(&p, at(2025, 1, 1)), p);

        let mut q = product(3.0, 1.0, ConsumptionPeriod::Daily, start);
        q.last_updated = None;
        assert_eq!(decay(&q, at(2025, 1, 1)), q);
    }

    #[test]
    fn zero_rate_leaves_stock_alone() {
        let start = at(2024, 1, 1);
        let p = product(3.0, 0.0, ConsumptionPeriod::Daily, start);
        assert_eq!(decay(&p, at(2024, 6, 1)), p);
    }

    #[test]
    fn now_before_last_update_is_a_no_op() {
        let start = at(2024, 6, 1);
        let p = product(3.0, 1.0, ConsumptionPeriod::Daily, start);
        assert_eq!(decay(&p, at(2024, 1, 1)), p);
    }

    #[test]
    fn depletion_estimate_lands_on_period_boundary() {
        let start = at(2024, 5, 1);
        let p = product(5.0, 2.0, ConsumptionPeriod::Daily, start);
        assert_eq!(depletion_estimate(&p, 0.0), Some(start + Duration::days(3)));
        assert_eq!(depletion_estimate(&p, 1.0), Some(start + Duration::days(2)));

        let mut flat = p.clone();
        flat.consumption_period = None;
        assert_eq!(depletion_estimate(&flat, 0.0), None);
    }
}
