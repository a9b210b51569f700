use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::candidate::Candidate};

/// A request to create a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<ApiId>,
    pub profile_photo: Option<String>,
}

/// A partial update to a candidate. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<ApiId>,
    pub profile_photo: Option<String>,
}

/// A candidate as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub profile_photo: String,
    pub position: ApiId,
    pub votes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let full_name = candidate.full_name();
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            first_name: core.first_name,
            last_name: core.last_name,
            full_name,
            profile_photo: core.profile_photo,
            position: core.position.into(),
            votes: core.votes,
            created_at: core.created_at,
            updated_at: core.updated_at,
        }
    }
}
