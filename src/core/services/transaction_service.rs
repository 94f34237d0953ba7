//! Business logic helpers for the household budget: planning, settling, and ending
//! recurring entries.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::info;

use crate::core::time::Clock;
use crate::errors::HouseholdError;
use crate::household::{
    month_end, parse_projection_id, project, Household, Transaction, TransactionStatus,
};

use super::{ServiceError, ServiceResult};

/// Provides validated lifecycle operations for household transactions.
pub struct TransactionService;

impl TransactionService {
    /// Stores a new planned or completed transaction and returns its identifier.
    pub fn add(
        household: &mut Household,
        transaction: Transaction,
        clock: &dyn Clock,
    ) -> ServiceResult<String> {
        if transaction.is_recurrent_projection {
            return Err(ServiceError::Invalid(
                "projected instances are materialized, not added".into(),
            ));
        }
        transaction.validate()?;
        if household.transaction(&transaction.id).is_some() {
            return Err(ServiceError::Invalid(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        if let Some(planned_id) = transaction.planned_id.as_deref() {
            if household.transaction(planned_id).is_none() {
                return Err(HouseholdError::TransactionNotFound(planned_id.to_string()).into());
            }
        }
        let id = household.add_transaction(transaction, clock.now());
        info!(transaction = %id, "transaction added");
        Ok(id)
    }

    /// Settles a planned entry (persisted or projected) with a new completed record.
    pub fn complete(
        household: &mut Household,
        id: &str,
        actual_amount: Option<f64>,
        actual_date: Option<NaiveDate>,
        clock: &dyn Clock,
    ) -> ServiceResult<String> {
        let planned = Self::resolve_planned(household, id)?;
        Self::ensure_unsettled(household, &planned)?;
        let completed = planned.completion(actual_amount, actual_date)?;
        let new_id = household.add_transaction(completed, clock.now());
        info!(planned = %id, completed = %new_id, "planned transaction completed");
        Ok(new_id)
    }

    /// Closes a planned entry (persisted or projected) with a new cancelled record.
    pub fn cancel(household: &mut Household, id: &str, clock: &dyn Clock) -> ServiceResult<String> {
        let planned = Self::resolve_planned(household, id)?;
        Self::ensure_unsettled(household, &planned)?;
        let cancelled = planned.cancellation()?;
        let new_id = household.add_transaction(cancelled, clock.now());
        info!(planned = %id, cancelled = %new_id, "planned transaction cancelled");
        Ok(new_id)
    }

    /// Edits an already-completed record in place. The id, status, and plan link are fixed.
    pub fn edit_completed<F>(
        household: &mut Household,
        id: &str,
        mutator: F,
        clock: &dyn Clock,
    ) -> ServiceResult<()>
    where
        F: FnOnce(&mut Transaction),
    {
        let original = household
            .transaction(id)
            .cloned()
            .ok_or_else(|| HouseholdError::TransactionNotFound(id.to_string()))?;
        if original.status != TransactionStatus::Completed {
            return Err(HouseholdError::InvalidTransition(format!(
                "only completed transactions can be edited in place, {id} is {}",
                original.status
            ))
            .into());
        }

        let mut edited = original.clone();
        mutator(&mut edited);
        if edited.id != original.id
            || edited.status != original.status
            || edited.planned_id != original.planned_id
        {
            return Err(ServiceError::Invalid(
                "id, status and plan link of a completed transaction cannot change".into(),
            ));
        }
        if edited.planned_id.is_some() && edited.month() != original.month() {
            return Err(ServiceError::Invalid(
                "a completion cannot move out of its planned month".into(),
            ));
        }
        edited.validate()?;

        if let Some(slot) = household.transaction_mut(id) {
            *slot = edited;
        }
        household.touch(clock.now());
        info!(transaction = %id, "completed transaction edited");
        Ok(())
    }

    /// Removes a transaction. Removing a future instance of a recurring entry ends the
    /// recurrence instead of deleting its source; sources themselves cannot be removed.
    /// Instances dated before today are cancelled, not removed.
    pub fn remove(household: &mut Household, id: &str, clock: &dyn Clock) -> ServiceResult<()> {
        if let Some(txn) = household.transaction(id) {
            if txn.is_recurrence_source() {
                return Err(HouseholdError::InvalidTransition(format!(
                    "recurring transaction {id} is ended, not deleted"
                ))
                .into());
            }
            let recurring_instance = txn.status == TransactionStatus::Planned
                && txn
                    .planned_id
                    .as_deref()
                    .and_then(|source| household.transaction(source))
                    .is_some_and(Transaction::is_recurrence_source);
            if recurring_instance {
                Self::ensure_not_past(id, txn.date, clock)?;
                let source = txn.plan_root().to_string();
                let from = txn.date;
                Self::end_recurrence(household, &source, from, clock)?;
                return Ok(());
            }
            household.remove_transaction(id, clock.now());
            info!(transaction = %id, "transaction removed");
            return Ok(());
        }

        let instance = Self::resolve_planned(household, id)?;
        Self::ensure_not_past(id, instance.date, clock)?;
        let source = instance.plan_root().to_string();
        Self::end_recurrence(household, &source, instance.date, clock)?;
        Ok(())
    }

    /// Ends a recurring source so that no instance falls on or after `from`. Planned
    /// instances already materialized from that date on are dropped; their count is returned.
    pub fn end_recurrence(
        household: &mut Household,
        source_id: &str,
        from: NaiveDate,
        clock: &dyn Clock,
    ) -> ServiceResult<usize> {
        let source = household
            .transaction(source_id)
            .ok_or_else(|| HouseholdError::TransactionNotFound(source_id.to_string()))?;
        if !source.is_recurrence_source() {
            return Err(HouseholdError::InvalidTransition(format!(
                "transaction {source_id} is not a recurring source"
            ))
            .into());
        }
        if from <= source.date {
            return Err(ServiceError::Invalid(format!(
                "recurrence can only end after its first occurrence on {}",
                source.date
            )));
        }
        let end = from
            .pred_opt()
            .ok_or_else(|| ServiceError::Invalid(format!("no date precedes {from}")))?;
        let end = match source.recurrence_end_date {
            Some(existing) if existing < end => existing,
            _ => end,
        };

        if let Some(source) = household.transaction_mut(source_id) {
            source.recurrence_end_date = Some(end);
        }
        let before = household.transactions.len();
        household.transactions.retain(|txn| {
            !(txn.status == TransactionStatus::Planned
                && txn.planned_id.as_deref() == Some(source_id)
                && txn.date >= from)
        });
        let dropped = before - household.transactions.len();
        household.touch(clock.now());
        info!(source = %source_id, %end, dropped, "recurrence ended");
        Ok(dropped)
    }

    /// Persists every projection up to `horizon` as an ordinary planned record keyed by its
    /// projection id. Returns the ids written; ids already present are skipped.
    pub fn materialize_projections(
        household: &mut Household,
        horizon: NaiveDate,
        clock: &dyn Clock,
    ) -> Vec<String> {
        let projected = project(&household.transactions, horizon);
        let existing: HashSet<String> = household
            .transactions
            .iter()
            .map(|txn| txn.id.clone())
            .collect();
        let now = clock.now();
        let mut created = Vec::new();
        for mut txn in projected {
            if existing.contains(&txn.id) {
                continue;
            }
            txn.is_recurrent_projection = false;
            created.push(household.add_transaction(txn, now));
        }
        info!(count = created.len(), %horizon, "materialized projected transactions");
        created
    }

    /// Stored transactions plus projections up to `horizon`, ordered by date.
    pub fn with_projections(household: &Household, horizon: NaiveDate) -> Vec<Transaction> {
        let mut all = household.transactions.clone();
        all.extend(project(&household.transactions, horizon));
        all.sort_by_key(|txn| txn.date);
        all
    }

    /// Planned entries up to `horizon`, projections included, that no completion or
    /// cancellation has settled yet. Ordered by date.
    pub fn outstanding(household: &Household, horizon: NaiveDate) -> Vec<Transaction> {
        let settled = settled_keys(&household.transactions);
        let mut seen = HashSet::new();
        let mut lines: Vec<Transaction> = household
            .transactions
            .iter()
            .filter(|txn| txn.status == TransactionStatus::Planned && txn.date <= horizon)
            .cloned()
            .chain(project(&household.transactions, horizon))
            .filter(|txn| {
                let (root, year, month) = txn.plan_key();
                !settled.contains(&(root, year, month))
                    && seen.insert((root.to_string(), year, month))
            })
            .collect();
        lines.sort_by_key(|txn| txn.date);
        lines
    }

    /// Returns a snapshot of the stored transactions.
    pub fn list(household: &Household) -> Vec<&Transaction> {
        household.transactions.iter().collect()
    }

    fn resolve_planned(household: &Household, id: &str) -> ServiceResult<Transaction> {
        if let Some(txn) = household.transaction(id) {
            return Ok(txn.clone());
        }
        let not_found = || HouseholdError::TransactionNotFound(id.to_string());
        let (_, year, month) = parse_projection_id(id).ok_or_else(not_found)?;
        let horizon = month_end(year, month).ok_or_else(not_found)?;
        project(&household.transactions, horizon)
            .into_iter()
            .find(|txn| txn.id == id)
            .ok_or_else(|| not_found().into())
    }

    fn ensure_not_past(id: &str, date: NaiveDate, clock: &dyn Clock) -> ServiceResult<()> {
        if date < clock.today() {
            return Err(HouseholdError::InvalidTransition(format!(
                "instance {id} on {date} is in the past, cancel it instead"
            ))
            .into());
        }
        Ok(())
    }

    fn ensure_unsettled(household: &Household, planned: &Transaction) -> ServiceResult<()> {
        let key = planned.plan_key();
        if settled_keys(&household.transactions).contains(&key) {
            return Err(HouseholdError::InvalidTransition(format!(
                "transaction {} is already settled for {}-{:02}",
                planned.id, key.1, key.2
            ))
            .into());
        }
        Ok(())
    }
}

fn settled_keys(transactions: &[Transaction]) -> HashSet<(&str, i32, u32)> {
    transactions
        .iter()
        .filter(|txn| txn.status != TransactionStatus::Planned && txn.planned_id.is_some())
        .map(Transaction::plan_key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::household::{ExpenseCategory, IncomeCategory, TransactionCategory};
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap())
    }

    fn household_with_salary() -> (Household, String) {
        let mut household = Household::new("Home", clock().0);
        let salary = Transaction::planned(
            "Salary",
            3000.0,
            TransactionCategory::Income(IncomeCategory::Salary),
            date(2024, 1, 25),
        )
        .with_recurrence(None);
        let id = TransactionService::add(&mut household, salary, &clock()).unwrap();
        (household, id)
    }

    #[test]
    fn add_rejects_projections_and_duplicates() {
        let (mut household, id) = household_with_salary();
        let projection = project(&household.transactions, date(2024, 3, 1)).remove(0);
        assert!(TransactionService::add(&mut household, projection, &clock()).is_err());

        let duplicate = household.transaction(&id).cloned().unwrap();
        let err = TransactionService::add(&mut household, duplicate, &clock())
            .expect_err("duplicate ids are rejected");
        assert!(matches!(err, ServiceError::Invalid(ref msg) if msg.contains("already exists")));
    }

    #[test]
    fn completing_a_projection_materializes_its_month() {
        let (mut household, id) = household_with_salary();
        let feb = crate::household::projection_id(&id, 2024, 2);
        let done_id =
            TransactionService::complete(&mut household, &feb, Some(3100.0), None, &clock())
                .unwrap();

        let done = household.transaction(&done_id).unwrap();
        assert_eq!(done.status, TransactionStatus::Completed);
        assert_eq!(done.planned_amount, Some(3000.0));
        assert_eq!(done.amount, 3100.0);
        assert_eq!(done.date, date(2024, 2, 25));

        let remaining = project(&household.transactions, date(2024, 3, 31));
        let months: Vec<_> = remaining.iter().map(|t| t.month()).collect();
        assert_eq!(months, vec![(2024, 3)]);

        let err = TransactionService::cancel(&mut household, &feb, &clock());
        assert!(err.is_err(), "a settled projection is no longer resolvable");
    }

    #[test]
    fn settling_twice_is_rejected() {
        let (mut household, id) = household_with_salary();
        TransactionService::complete(&mut household, &id, None, None, &clock()).unwrap();
        let err = TransactionService::cancel(&mut household, &id, &clock())
            .expect_err("second settlement must fail");
        assert!(matches!(
            err,
            ServiceError::Household(HouseholdError::InvalidTransition(_))
        ));
    }

    #[test]
    fn edit_completed_updates_in_place() {
        let mut household = Household::new("Home", clock().0);
        let groceries = Transaction::completed(
            "Market",
            54.2,
            TransactionCategory::Expense(ExpenseCategory::Groceries),
            date(2024, 1, 6),
        );
        let id = TransactionService::add(&mut household, groceries, &clock()).unwrap();
        TransactionService::edit_completed(&mut household, &id, |t| t.amount = 58.0, &clock())
            .unwrap();
        assert_eq!(household.transaction(&id).unwrap().amount, 58.0);

        let err = TransactionService::edit_completed(
            &mut household,
            &id,
            |t| t.status = TransactionStatus::Planned,
            &clock(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn removing_a_future_instance_ends_the_source() {
        let (mut household, id) = household_with_salary();
        TransactionService::materialize_projections(&mut household, date(2024, 4, 30), &clock());
        assert_eq!(household.transactions.len(), 4);

        let march = crate::household::projection_id(&id, 2024, 3);
        TransactionService::remove(&mut household, &march, &clock()).unwrap();

        let source = household.transaction(&id).unwrap();
        assert_eq!(source.recurrence_end_date, Some(date(2024, 3, 24)));
        let months: Vec<_> = household.transactions.iter().map(|t| t.month()).collect();
        assert_eq!(months, vec![(2024, 1), (2024, 2)]);
        assert!(project(&household.transactions, date(2024, 12, 31)).is_empty());
    }

    #[test]
    fn removing_a_projected_instance_ends_the_source() {
        let (mut household, id) = household_with_salary();
        let may = crate::household::projection_id(&id, 2024, 5);
        TransactionService::remove(&mut household, &may, &clock()).unwrap();
        let projected = project(&household.transactions, date(2024, 12, 31));
        assert_eq!(projected.len(), 3);
    }

    #[test]
    fn past_instances_are_cancelled_not_removed() {
        let (mut household, id) = household_with_salary();
        TransactionService::materialize_projections(&mut household, date(2024, 2, 29), &clock());
        let later = FixedClock(Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap());

        for instance in [
            crate::household::projection_id(&id, 2024, 2),
            crate::household::projection_id(&id, 2024, 3),
        ] {
            let err = TransactionService::remove(&mut household, &instance, &later)
                .expect_err("past instances stay in the series");
            assert!(matches!(
                err,
                ServiceError::Household(HouseholdError::InvalidTransition(_))
            ));
        }
        assert_eq!(household.transaction(&id).unwrap().recurrence_end_date, None);
        assert_eq!(household.transactions.len(), 2);

        TransactionService::cancel(
            &mut household,
            &crate::household::projection_id(&id, 2024, 2),
            &later,
        )
        .unwrap();
        assert_eq!(household.transactions.len(), 3);
    }

    #[test]
    fn sources_cannot_be_deleted() {
        let (mut household, id) = household_with_salary();
        assert!(TransactionService::remove(&mut household, &id, &clock()).is_err());
        assert!(household.transaction(&id).is_some());
    }

    #[test]
    fn outstanding_excludes_settled_lines() {
        let (mut household, id) = household_with_salary();
        TransactionService::complete(&mut household, &id, None, None, &clock()).unwrap();
        let open = TransactionService::outstanding(&household, date(2024, 3, 31));
        let months: Vec<_> = open.iter().map(|t| t.month()).collect();
        assert_eq!(months, vec![(2024, 2), (2024, 3)]);
    }
}
