use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::{new_record_id, Displayable, Identifiable, NamedEntity};
use crate::errors::{HouseholdError, Result};

/// Inventory item with an optional consumption profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub unit: Unit,
    pub price: f64,
    /// Amount bought on the last purchase.
    pub quantity: f64,
    pub current_stock: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption_period: Option<ConsumptionPeriod>,
}

impl Product {
    /// New product stocked with the purchased quantity as of `now`.
    pub fn new(
        name: impl Into<String>,
        unit: Unit,
        price: f64,
        quantity: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            unit,
            price,
            quantity,
            current_stock: quantity,
            last_updated: Some(now),
            consumption_rate: None,
            consumption_period: None,
        }
    }

    pub fn with_consumption(mut self, rate: f64, period: ConsumptionPeriod) -> Self {
        self.consumption_rate = Some(rate);
        self.consumption_period = Some(period);
        self
    }

    /// Records a stock count taken at `now`.
    pub fn observe_stock(&mut self, level: f64, now: DateTime<Utc>) {
        self.current_stock = level.max(0.0);
        self.last_updated = Some(now);
    }

    /// Adds a purchase on top of the current stock.
    pub fn restock(&mut self, quantity: f64, price: Option<f64>, now: DateTime<Utc>) {
        self.quantity = quantity;
        if let Some(price) = price {
            self.price = price;
        }
        self.current_stock = (self.current_stock + quantity).max(0.0);
        self.last_updated = Some(now);
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HouseholdError::InvalidInput(
                "product name cannot be empty".into(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(HouseholdError::InvalidInput(format!(
                "product price must not be negative, got {}",
                self.price
            )));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(HouseholdError::InvalidInput(format!(
                "product quantity must not be negative, got {}",
                self.quantity
            )));
        }
        if !self.current_stock.is_finite() || self.current_stock < 0.0 {
            return Err(HouseholdError::InvalidInput(format!(
                "current stock must not be negative, got {}",
                self.current_stock
            )));
        }
        match (self.consumption_rate, self.consumption_period) {
            (Some(rate), Some(_)) if !rate.is_finite() || rate < 0.0 => {
                Err(HouseholdError::InvalidInput(format!(
                    "consumption rate must not be negative, got {rate}"
                )))
            }
            (Some(_), None) | (None, Some(_)) => Err(HouseholdError::InvalidInput(
                "consumption rate and period must be set together".into(),
            )),
            _ => Ok(()),
        }
    }
}

impl Identifiable for Product {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Product {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Product {
    fn display_label(&self) -> String {
        format!("{} ({:.2} {})", self.name, self.current_stock, self.unit)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Unit {
    #[serde(rename = "pcs")]
    Piece,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "pack")]
    Pack,
    #[serde(rename = "dozen")]
    Dozen,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::Piece => "pcs",
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Liter => "l",
            Unit::Milliliter => "ml",
            Unit::Pack => "pack",
            Unit::Dozen => "dozen",
        };
        f.write_str(symbol)
    }
}

/// Period a consumption rate applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumptionPeriod {
    Daily,
    Weekly,
    /// Fixed 14-day block, not a calendar half-month.
    HalfMonthly,
    Monthly,
}

impl fmt::Display for ConsumptionPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConsumptionPeriod::Daily => "daily",
            ConsumptionPeriod::Weekly => "weekly",
            ConsumptionPeriod::HalfMonthly => "half-monthly",
            ConsumptionPeriod::Monthly => "monthly",
        };
        f.write_str(label)
    }
}
