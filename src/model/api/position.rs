use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::position::{Position, PositionStatus},
};

/// A request to create a position.
///
/// The numeric rules are signed so that negative values reach validation and
/// are reported as range errors rather than as malformed JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PositionStatus>,
    pub order: Option<i32>,
    pub min_winners: Option<i64>,
    pub min_selectable: Option<i64>,
    pub max_selectable: Option<i64>,
}

/// A partial update to a position. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PositionStatus>,
    pub order: Option<i32>,
    pub min_winners: Option<i64>,
    pub min_selectable: Option<i64>,
    pub max_selectable: Option<i64>,
}

/// A position as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDescription {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    pub status: PositionStatus,
    pub order: i32,
    pub min_winners: u32,
    pub min_selectable: u32,
    pub max_selectable: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Position> for PositionDescription {
    fn from(position: Position) -> Self {
        let core = position.position;
        Self {
            id: position.id.into(),
            name: core.name,
            description: core.description,
            status: core.status,
            order: core.order,
            min_winners: core.min_winners,
            min_selectable: core.min_selectable,
            max_selectable: core.max_selectable,
            created_at: core.created_at,
            updated_at: core.updated_at,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl PositionSpec {
        pub fn example() -> Self {
            Self {
                name: Some("President".to_string()),
                description: Some("Chairs the staff council".to_string()),
                status: None,
                order: Some(1),
                min_winners: Some(1),
                min_selectable: Some(1),
                max_selectable: Some(1),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: Some("Board Member".to_string()),
                description: None,
                status: None,
                order: Some(2),
                min_winners: Some(2),
                min_selectable: Some(1),
                max_selectable: Some(2),
            }
        }
    }
}
