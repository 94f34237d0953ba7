//! Inventory operations: stock observations, purchases, and persisting decay.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::core::time::Clock;
use crate::errors::HouseholdError;
use crate::household::{
    decay, periods_passed, stock::advance, ConsumptionPeriod, Household, Product,
};

use super::{ServiceError, ServiceResult};

pub struct ProductService;

impl ProductService {
    pub fn add(household: &mut Household, product: Product, clock: &dyn Clock) -> ServiceResult<String> {
        product.validate()?;
        Self::validate_name(household, &product.name)?;
        let id = household.add_product(product, clock.now());
        info!(product = %id, "product added");
        Ok(id)
    }

    /// Records a stock count. Consumption accrued so far is discarded in favour of the count.
    pub fn observe_stock(
        household: &mut Household,
        id: &str,
        level: f64,
        clock: &dyn Clock,
    ) -> ServiceResult<()> {
        if !level.is_finite() || level < 0.0 {
            return Err(ServiceError::Invalid(format!(
                "stock level must not be negative, got {level}"
            )));
        }
        let now = clock.now();
        Self::product_mut(household, id)?.observe_stock(level, now);
        household.touch(now);
        info!(product = %id, level, "stock observed");
        Ok(())
    }

    /// Adds a purchase on top of the decayed stock.
    pub fn record_purchase(
        household: &mut Household,
        id: &str,
        quantity: f64,
        price: Option<f64>,
        clock: &dyn Clock,
    ) -> ServiceResult<()> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(ServiceError::Invalid(format!(
                "purchased quantity must be positive, got {quantity}"
            )));
        }
        if price.is_some_and(|p| !p.is_finite() || p < 0.0) {
            return Err(ServiceError::Invalid("price must not be negative".into()));
        }
        let now = clock.now();
        let product = Self::product_mut(household, id)?;
        settle(product, now);
        product.restock(quantity, price, now);
        household.touch(now);
        info!(product = %id, quantity, "purchase recorded");
        Ok(())
    }

    /// Replaces the consumption profile. Decay under the previous profile is persisted first.
    pub fn set_consumption(
        household: &mut Household,
        id: &str,
        profile: Option<(f64, ConsumptionPeriod)>,
        clock: &dyn Clock,
    ) -> ServiceResult<()> {
        let now = clock.now();
        let product = Self::product_mut(household, id)?;
        let mut updated = product.clone();
        settle(&mut updated, now);
        updated.consumption_rate = profile.map(|(rate, _)| rate);
        updated.consumption_period = profile.map(|(_, period)| period);
        updated.validate()?;
        *product = updated;
        household.touch(now);
        Ok(())
    }

    /// Persists the decay accrued by every product. `last_updated` advances by the whole
    /// periods consumed so partial progress carries over to the next run. Returns the number
    /// of products whose stock changed.
    pub fn settle_decay(household: &mut Household, clock: &dyn Clock) -> usize {
        let now = clock.now();
        let changed = household
            .products
            .iter_mut()
            .map(|product| settle(product, now))
            .filter(|changed| *changed)
            .count();
        if changed > 0 {
            household.touch(now);
        }
        info!(changed, "stock decay settled");
        changed
    }

    /// Decayed view of every product as of the clock's time; nothing is persisted.
    pub fn stock_levels(household: &Household, clock: &dyn Clock) -> Vec<Product> {
        let now = clock.now();
        household
            .products
            .iter()
            .map(|product| decay(product, now))
            .collect()
    }

    pub fn remove(household: &mut Household, id: &str, clock: &dyn Clock) -> ServiceResult<Product> {
        household
            .remove_product(id, clock.now())
            .ok_or_else(|| HouseholdError::ProductNotFound(id.to_string()).into())
    }

    fn product_mut<'a>(household: &'a mut Household, id: &str) -> ServiceResult<&'a mut Product> {
        household
            .product_mut(id)
            .ok_or_else(|| HouseholdError::ProductNotFound(id.to_string()).into())
    }

    fn validate_name(household: &Household, name: &str) -> ServiceResult<()> {
        let trimmed = name.trim();
        let taken = household
            .products
            .iter()
            .any(|product| product.name.trim().eq_ignore_ascii_case(trimmed));
        if taken {
            return Err(ServiceError::Invalid(format!(
                "a product named `{trimmed}` already exists"
            )));
        }
        Ok(())
    }
}

fn settle(product: &mut Product, now: DateTime<Utc>) -> bool {
    let decayed = decay(product, now);
    if decayed.current_stock >= product.current_stock {
        return false;
    }
    let (Some(period), Some(last_updated)) = (product.consumption_period, product.last_updated)
    else {
        return false;
    };
    let periods = periods_passed(period, last_updated, now);
    debug!(product = %product.id, periods, "applying stock decay");
    product.current_stock = decayed.current_stock;
    product.last_updated = u32::try_from(periods)
        .ok()
        .and_then(|whole| advance(period, last_updated, whole))
        .or(Some(now));
    true
}
