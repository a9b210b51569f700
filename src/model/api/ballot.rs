use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::ballot::{Ballot, Selections},
    mongodb::serde_string_map,
};

/// A ballot submitted by a voter: `{ "votesByPosition": { positionId: [candidateId, ...] } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSpec {
    #[serde(default, with = "serde_string_map")]
    pub votes_by_position: Vec<(ApiId, Vec<ApiId>)>,
}

impl From<BallotSpec> for Selections {
    fn from(spec: BallotSpec) -> Self {
        Selections::new(
            spec.votes_by_position
                .into_iter()
                .map(|(position, candidates)| {
                    (
                        position.into(),
                        candidates.into_iter().map(Into::into).collect(),
                    )
                })
                .collect(),
        )
    }
}

/// A recorded ballot as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotDescription {
    pub id: ApiId,
    pub voter: ApiId,
    #[serde(with = "serde_string_map")]
    pub votes_by_position: Vec<(ApiId, Vec<ApiId>)>,
    pub created_at: DateTime<Utc>,
}

impl From<Ballot> for BallotDescription {
    fn from(ballot: Ballot) -> Self {
        let core = ballot.ballot;
        Self {
            id: ballot.id.into(),
            voter: core.voter.into(),
            votes_by_position: core
                .selections
                .into_inner()
                .into_iter()
                .map(|(position, candidates)| {
                    (
                        position.into(),
                        candidates.into_iter().map(Into::into).collect(),
                    )
                })
                .collect(),
            created_at: core.created_at,
        }
    }
}
