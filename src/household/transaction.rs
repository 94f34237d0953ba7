use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::common::{is_false, new_record_id, Displayable, Identifiable};
use crate::errors::{HouseholdError, Result};

/// A planned or realized income/expense entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: TransactionCategory,
    pub date: NaiveDate,
    #[serde(default)]
    pub recurrent: bool,
    pub status: TransactionStatus,
    /// Lookup-only reference to the planned record this one was generated from or settles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_recurrent_projection: bool,
}

impl Transaction {
    /// Creates a budgeted entry that has not happened yet.
    pub fn planned(
        description: impl Into<String>,
        amount: f64,
        category: TransactionCategory,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: new_record_id(),
            description: description.into(),
            amount,
            category,
            date,
            recurrent: false,
            status: TransactionStatus::Planned,
            planned_id: None,
            planned_amount: None,
            recurrence_end_date: None,
            is_recurrent_projection: false,
        }
    }

    /// Creates an entry logged directly as an actual, with no plan behind it.
    pub fn completed(
        description: impl Into<String>,
        amount: f64,
        category: TransactionCategory,
        date: NaiveDate,
    ) -> Self {
        Self {
            status: TransactionStatus::Completed,
            ..Self::planned(description, amount, category, date)
        }
    }

    /// Marks the entry as repeating monthly, optionally up to `end`.
    pub fn with_recurrence(mut self, end: Option<NaiveDate>) -> Self {
        self.recurrent = true;
        self.recurrence_end_date = end;
        self
    }

    pub fn kind(&self) -> TransactionKind {
        self.category.kind()
    }

    /// Original planned recurring entry: not a projection, completion or cancellation.
    pub fn is_recurrence_source(&self) -> bool {
        self.recurrent && self.status == TransactionStatus::Planned && self.planned_id.is_none()
    }

    /// Identifier of the plan this entry belongs to; its own id for originals.
    pub fn plan_root(&self) -> &str {
        self.planned_id.as_deref().unwrap_or(&self.id)
    }

    pub fn month(&self) -> (i32, u32) {
        (self.date.year(), self.date.month())
    }

    /// Plan and month this entry budgets or settles. A planned entry and the completion or
    /// cancellation that closes it share the same key.
    pub fn plan_key(&self) -> (&str, i32, u32) {
        (self.plan_root(), self.date.year(), self.date.month())
    }

    /// Builds the completed record that settles this planned entry. The actual amount and
    /// date default to the planned ones; the planned amount is preserved.
    pub fn completion(
        &self,
        actual_amount: Option<f64>,
        actual_date: Option<NaiveDate>,
    ) -> Result<Transaction> {
        self.ensure_planned("complete")?;
        let mut settled = self.settlement(TransactionStatus::Completed);
        if let Some(amount) = actual_amount {
            settled.amount = amount;
        }
        if let Some(date) = actual_date {
            // The month links a completion to its plan line; it cannot move.
            if (date.year(), date.month()) != self.month() {
                return Err(HouseholdError::InvalidInput(format!(
                    "completion date {date} must fall in the planned month of {}",
                    self.date
                )));
            }
            settled.date = date;
        }
        settled.validate()?;
        Ok(settled)
    }

    /// Builds the cancelled record that closes this planned entry without spending.
    pub fn cancellation(&self) -> Result<Transaction> {
        self.ensure_planned("cancel")?;
        Ok(self.settlement(TransactionStatus::Cancelled))
    }

    fn ensure_planned(&self, action: &str) -> Result<()> {
        if self.status != TransactionStatus::Planned {
            return Err(HouseholdError::InvalidTransition(format!(
                "cannot {action} transaction {} in status {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    fn settlement(&self, status: TransactionStatus) -> Transaction {
        Transaction {
            id: new_record_id(),
            description: self.description.clone(),
            amount: self.amount,
            category: self.category,
            date: self.date,
            recurrent: false,
            status,
            planned_id: Some(self.plan_root().to_string()),
            planned_amount: Some(self.amount),
            recurrence_end_date: None,
            is_recurrent_projection: false,
        }
    }

    /// Boundary checks applied before a record is stored.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(HouseholdError::InvalidInput(
                "transaction id cannot be empty".into(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(HouseholdError::InvalidInput(
                "transaction description cannot be empty".into(),
            ));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(HouseholdError::InvalidInput(format!(
                "transaction amount must be positive, got {}",
                self.amount
            )));
        }
        if let Some(planned) = self.planned_amount {
            if !planned.is_finite() || planned < 0.0 {
                return Err(HouseholdError::InvalidInput(format!(
                    "planned amount must not be negative, got {planned}"
                )));
            }
        }
        if let Some(end) = self.recurrence_end_date {
            if !self.recurrent {
                return Err(HouseholdError::InvalidInput(
                    "recurrence end date requires a recurrent transaction".into(),
                ));
            }
            if end < self.date {
                return Err(HouseholdError::InvalidInput(format!(
                    "recurrence end date {end} precedes transaction date {}",
                    self.date
                )));
            }
        }
        Ok(())
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!(
            "{} {} {:.2} ({}, {})",
            self.date, self.description, self.amount, self.category, self.status
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Planned,
    Completed,
    Cancelled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Planned => "planned",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => f.write_str("income"),
            TransactionKind::Expense => f.write_str("expense"),
        }
    }
}

/// Closed category set, one enum per transaction kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TransactionCategory {
    Income(IncomeCategory),
    Expense(ExpenseCategory),
}

impl TransactionCategory {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionCategory::Income(_) => TransactionKind::Income,
            TransactionCategory::Expense(_) => TransactionKind::Expense,
        }
    }
}

impl fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionCategory::Income(category) => write!(f, "income/{category:?}"),
            TransactionCategory::Expense(category) => write!(f, "expense/{category:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncomeCategory {
    Salary,
    Business,
    Investment,
    Rental,
    Pension,
    Gift,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Housing,
    Utilities,
    Groceries,
    Transport,
    Healthcare,
    Education,
    Insurance,
    Clothing,
    Entertainment,
    Debt,
    Other,
}
