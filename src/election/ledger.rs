use log::debug;

use crate::error::Result;
use crate::model::{
    db::ballot::{Ballot, NewBallot, Selections},
    mongodb::Id,
};
use crate::store::{store_guard, Db};

/// The record of cast ballots, at most one per voter.
pub struct VoteLedger {
    db: Db,
}

store_guard!(VoteLedger);

impl VoteLedger {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Does the voter have a ballot on record?
    pub async fn has_voted(&self, voter: Id) -> Result<bool> {
        Ok(self.db.find_ballot_for_voter(voter).await?.is_some())
    }

    /// Record a ballot. Fails with `AlreadyVoted` if the voter already has one,
    /// including when two submissions race.
    pub async fn record_ballot(&self, voter: Id, selections: Selections) -> Result<Ballot> {
        let ballot = self
            .db
            .insert_ballot(&NewBallot::new(voter, selections))
            .await?;
        debug!("Recorded ballot {} for voter {voter}", ballot.id);
        Ok(ballot)
    }

    pub async fn all(&self) -> Result<Vec<Ballot>> {
        self.db.list_ballots().await
    }

    /// Destroy every ballot. Returns how many were deleted.
    pub async fn clear_all(&self) -> Result<u64> {
        self.db.delete_all_ballots().await
    }
}
