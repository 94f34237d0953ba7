use tracing::info;

use crate::core::time::Clock;
use crate::errors::HouseholdError;
use crate::household::{Household, Member};

use super::{ServiceError, ServiceResult};

pub struct MemberService;

impl MemberService {
    pub fn add(household: &mut Household, member: Member, clock: &dyn Clock) -> ServiceResult<String> {
        member.validate()?;
        if household.member(&member.id).is_some() {
            return Err(ServiceError::Invalid(format!(
                "member `{}` already exists",
                member.id
            )));
        }
        let id = household.add_member(member, clock.now());
        info!(member = %id, "member added");
        Ok(id)
    }

    /// Applies `mutator` to a copy of the member; the copy replaces the stored one only if
    /// it still validates and keeps its id.
    pub fn update<F>(
        household: &mut Household,
        id: &str,
        clock: &dyn Clock,
        mutator: F,
    ) -> ServiceResult<()>
    where
        F: FnOnce(&mut Member),
    {
        let member = household
            .member_mut(id)
            .ok_or_else(|| HouseholdError::MemberNotFound(id.to_string()))?;
        let mut updated = member.clone();
        mutator(&mut updated);
        if updated.id != member.id {
            return Err(ServiceError::Invalid("member id cannot change".into()));
        }
        updated.validate()?;
        *member = updated;
        household.touch(clock.now());
        Ok(())
    }

    pub fn remove(household: &mut Household, id: &str, clock: &dyn Clock) -> ServiceResult<Member> {
        let removed = household
            .remove_member(id, clock.now())
            .ok_or_else(|| HouseholdError::MemberNotFound(id.to_string()))?;
        info!(member = %id, "member removed");
        Ok(removed)
    }

    pub fn list(household: &Household) -> Vec<&Member> {
        let mut members: Vec<&Member> = household.members.iter().collect();
        members.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        members
    }
}
