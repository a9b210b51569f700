use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Photo reference used when none is uploaded.
pub const DEFAULT_PROFILE_PHOTO: &str = "default.jpg";

/// Capitalise the first letter of each word and lowercase the rest.
///
/// Words are runs of alphanumeric characters, so "o'neil-smith" becomes "O'Neil-Smith".
pub fn title_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            result.push(c);
            at_word_start = true;
        }
    }
    result
}

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCore {
    pub first_name: String,
    pub last_name: String,
    pub profile_photo: String,
    /// The position this candidate is standing for.
    pub position: Id,
    /// Only ever changed by atomic increments, or reset between election cycles.
    pub votes: u64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl CandidateCore {
    /// Create a new candidate with no votes. Names are normalised to title case.
    pub fn new(
        first_name: &str,
        last_name: &str,
        position: Id,
        profile_photo: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            first_name: title_case(first_name),
            last_name: title_case(last_name),
            profile_photo: profile_photo.unwrap_or_else(|| DEFAULT_PROFILE_PHOTO.to_string()),
            position,
            votes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Does the search text appear in either name, ignoring case?
    pub fn matches_search(&self, search: &str) -> bool {
        let search = search.to_lowercase();
        self.first_name.to_lowercase().contains(&search)
            || self.last_name.to_lowercase().contains(&search)
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}
