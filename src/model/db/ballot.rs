use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{serde_string_map, Id};

/// A voter's choices: position IDs mapped to the candidates chosen for each,
/// in the order the positions were submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selections(#[serde(with = "serde_string_map")] Vec<(Id, Vec<Id>)>);

impl Selections {
    /// Build selections, collapsing repeated candidates within a position.
    /// A candidate list is a set, so repeating an ID does not count twice.
    pub fn new(entries: Vec<(Id, Vec<Id>)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(position, candidates)| {
                let mut unique: Vec<Id> = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    if !unique.contains(&candidate) {
                        unique.push(candidate);
                    }
                }
                (position, unique)
            })
            .collect();
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Id, Vec<Id>)> {
        self.0.iter()
    }

    /// Total number of candidates selected across all positions.
    pub fn total_selected(&self) -> usize {
        self.0.iter().map(|(_, candidates)| candidates.len()).sum()
    }

    /// Every selected candidate, across all positions.
    pub fn candidates(&self) -> impl Iterator<Item = Id> + '_ {
        self.0
            .iter()
            .flat_map(|(_, candidates)| candidates.iter().copied())
    }

    pub fn into_inner(self) -> Vec<(Id, Vec<Id>)> {
        self.0
    }
}

/// Core ballot data, as stored in the database.
///
/// Ballots are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotCore {
    /// The voter who cast this ballot; unique across all ballots.
    pub voter: Id,
    pub selections: Selections,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl BallotCore {
    pub fn new(voter: Id, selections: Selections) -> Self {
        Self {
            voter,
            selections,
            created_at: Utc::now(),
        }
    }
}

/// A ballot without an ID.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

impl DerefMut for Ballot {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ballot
    }
}
