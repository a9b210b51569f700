use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::error::Result;
use crate::model::{
    api::election::{CandidateTally, ElectionResults, PositionResults},
    db::position::PositionStatus,
};
use crate::store::{CandidateFilter, Db};

use super::state::ElectionState;

/// Builds the per-position standings.
pub struct ResultsAggregator {
    db: Db,
    state: ElectionState,
}

impl ResultsAggregator {
    pub fn new(db: Db, state: ElectionState) -> Self {
        Self { db, state }
    }

    /// Standings for every active position. Vote counts and their ordering are
    /// withheld while voting is open.
    pub async fn results(&self) -> Result<ElectionResults> {
        let is_voting_open = self.state.is_voting_open();
        let positions = self.db.list_positions(Some(PositionStatus::Active)).await?;

        let mut results = Vec::with_capacity(positions.len());
        for position in positions {
            let mut candidates = self
                .db
                .list_candidates(&CandidateFilter {
                    position: Some(position.id),
                    ..Default::default()
                })
                .await?;
            // Most votes first, ties in creation order. While open, creation
            // order only, so the ordering cannot reveal the standings.
            if is_voting_open {
                candidates.sort_by_key(|c| c.id);
            } else {
                candidates.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.id.cmp(&b.id)));
            }

            let tallies = candidates
                .into_iter()
                .map(|c| CandidateTally::new(c, is_voting_open))
                .collect();
            results.push(PositionResults::new(position, tallies));
        }

        Ok(ElectionResults {
            is_voting_open,
            positions: results,
        })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ResultsAggregator {
    type Error = ();

    /// Panics iff the [`Db`] or [`ElectionState`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Db>>().await.unwrap();
        let state = req.guard::<&State<ElectionState>>().await.unwrap();
        Outcome::Success(Self::new(db.inner().clone(), state.inner().clone()))
    }
}
