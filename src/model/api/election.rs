use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{candidate::Candidate, position::Position},
};

/// The public view of the voting flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStatus {
    pub is_voting_open: bool,
}

/// The public view of the registration flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub is_registration_open: bool,
}

/// Election results across every active position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub is_voting_open: bool,
    pub positions: Vec<PositionResults>,
}

/// Results for a single position, candidates ordered by votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResults {
    pub position_id: ApiId,
    pub position_name: String,
    pub number_of_winners: u32,
    pub candidates: Vec<CandidateTally>,
}

impl PositionResults {
    pub fn new(position: Position, candidates: Vec<CandidateTally>) -> Self {
        Self {
            position_id: position.id.into(),
            number_of_winners: position.min_winners,
            position_name: position.position.name,
            candidates,
        }
    }
}

/// One candidate's standing. `votes` is `null` while voting is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub id: ApiId,
    pub first_name: String,
    pub last_name: String,
    pub profile_photo: String,
    pub votes: Option<u64>,
}

impl CandidateTally {
    /// Describe the candidate, hiding their vote count if `redact` is set.
    pub fn new(candidate: Candidate, redact: bool) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            first_name: core.first_name,
            last_name: core.last_name,
            profile_photo: core.profile_photo,
            votes: (!redact).then_some(core.votes),
        }
    }
}

/// What an election-cycle clear removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearSummary {
    pub votes_deleted: u64,
    pub users_reset: u64,
    pub candidates_votes_reset: u64,
}

/// What a reconcile pass repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub candidates_recounted: u64,
    pub voters_flagged: u64,
}

/// How many accounts a bulk delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub deleted: u64,
}
