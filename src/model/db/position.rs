use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use rocket::form::FromFormField;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// Whether a position is currently on the ballot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    #[field(value = "active")]
    Active,
    #[field(value = "inactive")]
    Inactive,
}

impl Default for PositionStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl From<PositionStatus> for Bson {
    fn from(status: PositionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// The validated selection-count rules of a position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SelectionRules {
    pub min_winners: u32,
    pub min_selectable: u32,
    pub max_selectable: u32,
}

impl SelectionRules {
    /// Validate raw (possibly negative) values submitted by an admin.
    pub fn new(min_winners: i64, min_selectable: i64, max_selectable: i64) -> Result<Self> {
        if min_winners < 0 {
            return Err(Error::InvalidRange(format!(
                "minWinners ({min_winners}) cannot be less than 0"
            )));
        }
        if min_selectable < 0 {
            return Err(Error::InvalidRange(format!(
                "minSelectable ({min_selectable}) cannot be less than 0"
            )));
        }
        if max_selectable < 1 {
            return Err(Error::InvalidRange(format!(
                "maxSelectable ({max_selectable}) cannot be less than 1"
            )));
        }
        if max_selectable < min_selectable {
            return Err(Error::InvalidRange(format!(
                "maxSelectable ({max_selectable}) cannot be less than minSelectable ({min_selectable})"
            )));
        }
        let narrow = |value: i64, field: &str| {
            u32::try_from(value)
                .map_err(|_| Error::InvalidRange(format!("{field} ({value}) is too large")))
        };
        Ok(Self {
            min_winners: narrow(min_winners, "minWinners")?,
            min_selectable: narrow(min_selectable, "minSelectable")?,
            max_selectable: narrow(max_selectable, "maxSelectable")?,
        })
    }
}

/// Core position data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionCore {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: PositionStatus,
    /// Sort key for ballots and results; not unique.
    pub order: i32,
    pub min_winners: u32,
    pub min_selectable: u32,
    pub max_selectable: u32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl PositionCore {
    pub fn new(
        name: String,
        description: Option<String>,
        status: PositionStatus,
        order: i32,
        rules: SelectionRules,
    ) -> Self {
        let now = Utc::now();
        Self {
            name,
            description,
            status,
            order,
            min_winners: rules.min_winners,
            min_selectable: rules.min_selectable,
            max_selectable: rules.max_selectable,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rules(&self) -> SelectionRules {
        SelectionRules {
            min_winners: self.min_winners,
            min_selectable: self.min_selectable,
            max_selectable: self.max_selectable,
        }
    }

    pub fn set_rules(&mut self, rules: SelectionRules) {
        self.min_winners = rules.min_winners;
        self.min_selectable = rules.min_selectable;
        self.max_selectable = rules.max_selectable;
    }

    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    /// Check the number of candidates selected for this position on a ballot.
    pub fn check_selection_count(&self, received: usize) -> Result<()> {
        let min = self.min_selectable as usize;
        let max = self.max_selectable as usize;
        if received < min || received > max {
            return Err(Error::SelectionCountViolation {
                position: self.name.clone(),
                min: self.min_selectable,
                max: self.max_selectable,
                received,
            });
        }
        Ok(())
    }
}

/// A position without an ID.
pub type NewPosition = PositionCore;

/// A position from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl Deref for Position {
    type Target = PositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}

impl DerefMut for Position {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.position
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_reject_bad_ranges() {
        assert!(matches!(
            SelectionRules::new(-1, 0, 1),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SelectionRules::new(1, -1, 1),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SelectionRules::new(1, 0, 0),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SelectionRules::new(1, 3, 2),
            Err(Error::InvalidRange(_))
        ));
        assert!(matches!(
            SelectionRules::new(1, 0, i64::MAX),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn rules_accept_valid_ranges() {
        let rules = SelectionRules::new(0, 0, 1).unwrap();
        assert_eq!(rules.min_selectable, 0);
        assert_eq!(rules.max_selectable, 1);

        let rules = SelectionRules::new(3, 2, 2).unwrap();
        assert_eq!(rules.min_winners, 3);
        assert_eq!(rules.min_selectable, 2);
    }

    #[test]
    fn selection_count_bounds_are_inclusive() {
        let position = PositionCore::example2();
        assert!(matches!(
            position.check_selection_count(0),
            Err(Error::SelectionCountViolation { received: 0, .. })
        ));
        assert!(position.check_selection_count(1).is_ok());
        assert!(position.check_selection_count(2).is_ok());
        assert!(matches!(
            position.check_selection_count(3),
            Err(Error::SelectionCountViolation {
                min: 1,
                max: 2,
                received: 3,
                ..
            })
        ));
    }
}
