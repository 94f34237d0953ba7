//! Family member profiles.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::common::{new_record_id, Displayable, Identifiable, NamedEntity};
use crate::errors::{HouseholdError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_notes: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            birth_date: None,
            role: None,
            dietary_notes: None,
            allergies: Vec::new(),
        }
    }

    /// Age in whole years on `on`, if a birth date is known.
    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if on < birth {
            return None;
        }
        let mut years = on.year() - birth.year();
        if (on.month(), on.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(HouseholdError::InvalidInput(
                "member name cannot be empty".into(),
            ));
        }
        if self.allergies.iter().any(|a| a.trim().is_empty()) {
            return Err(HouseholdError::InvalidInput(
                "allergy entries cannot be blank".into(),
            ));
        }
        Ok(())
    }
}

impl Identifiable for Member {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Member {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Member {
    fn display_label(&self) -> String {
        match self.role {
            Some(role) => format!("{} ({})", self.name, role),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Adult,
    Child,
    Senior,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Adult => f.write_str("adult"),
            MemberRole::Child => f.write_str("child"),
            MemberRole::Senior => f.write_str("senior"),
        }
    }
}
