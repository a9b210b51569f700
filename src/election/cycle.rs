use std::collections::BTreeMap;

use log::{info, warn};

use crate::error::Result;
use crate::model::{
    api::election::{ClearSummary, ReconcileSummary},
    mongodb::Id,
};
use crate::store::{store_guard, CandidateFilter, Db};

use super::ledger::VoteLedger;

/// Maintenance between and after elections.
pub struct ElectionCycle {
    db: Db,
    ledger: VoteLedger,
}

store_guard!(ElectionCycle);

impl ElectionCycle {
    pub fn new(db: Db) -> Self {
        Self {
            ledger: VoteLedger::new(db.clone()),
            db,
        }
    }

    /// Prepare for the next election: delete all ballots, clear every voted
    /// flag and zero every tally. Positions, candidates and accounts are kept.
    pub async fn clear(&self, admin: Id) -> Result<ClearSummary> {
        let summary = ClearSummary {
            votes_deleted: self.ledger.clear_all().await?,
            users_reset: self.db.reset_all_voted().await?,
            candidates_votes_reset: self.db.reset_all_votes().await?,
        };
        warn!(
            "Election data cleared by admin {admin}: {} ballot(s) deleted, {} voter(s) reset, {} tally(s) reset",
            summary.votes_deleted, summary.users_reset, summary.candidates_votes_reset
        );
        Ok(summary)
    }

    /// Recompute derived state from the ballot ledger, repairing partial commits.
    ///
    /// Every tally is set to the number of ballots selecting that candidate and
    /// every voter with a ballot is flagged. Running it twice changes nothing the
    /// second time. Run it with voting closed, as a concurrent cast may be
    /// counted twice or not at all.
    pub async fn reconcile(&self, admin: Id) -> Result<ReconcileSummary> {
        let ballots = self.ledger.all().await?;

        let mut counts = BTreeMap::<Id, u64>::new();
        for ballot in &ballots {
            for candidate in ballot.selections.candidates() {
                *counts.entry(candidate).or_default() += 1;
            }
        }

        let mut summary = ReconcileSummary::default();
        let candidates = self.db.list_candidates(&CandidateFilter::default()).await?;
        for candidate in candidates {
            let expected = counts.get(&candidate.id).copied().unwrap_or_default();
            if candidate.votes != expected {
                warn!(
                    "Recounting candidate {}: {} -> {expected}",
                    candidate.id, candidate.votes
                );
                self.db.set_votes(candidate.id, expected).await?;
                summary.candidates_recounted += 1;
            }
        }

        for ballot in &ballots {
            if self.db.mark_voted(ballot.voter).await? {
                warn!("Flagged voter {} from ballot {}", ballot.voter, ballot.id);
                summary.voters_flagged += 1;
            }
        }

        info!(
            "Reconcile by admin {admin}: {} tally(s) corrected, {} voter(s) flagged",
            summary.candidates_recounted, summary.voters_flagged
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use crate::election::{casting::VoteCaster, state::ElectionState};
    use crate::error::Error;
    use crate::model::db::{
        ballot::Selections,
        candidate::{Candidate, CandidateCore},
        position::PositionCore,
        voter::VoterCore,
    };
    use crate::store::{FailPoint, MemoryStore};

    use super::*;

    async fn votes(db: &Db, candidate: &Candidate) -> u64 {
        db.find_candidate(candidate.id).await.unwrap().unwrap().votes
    }

    #[rocket::async_test]
    async fn clear_resets_everything_but_registries() {
        let db = Db::memory();
        let state = ElectionState::default();
        state.set_voting_open(true);
        let position = db.insert_position(&PositionCore::example()).await.unwrap();
        let candidate = db
            .insert_candidate(&CandidateCore::new("Ada", "Lovelace", position.id, None))
            .await
            .unwrap();
        let caster = VoteCaster::new(db.clone(), state);
        for voter in [VoterCore::example(), VoterCore::example2()] {
            let voter = db.insert_voter(&voter).await.unwrap();
            caster
                .cast(
                    voter.id,
                    Selections::new(vec![(position.id, vec![candidate.id])]),
                )
                .await
                .unwrap();
        }

        let cycle = ElectionCycle::new(db.clone());
        let summary = cycle.clear(Id::new()).await.unwrap();
        assert_eq!(
            summary,
            ClearSummary {
                votes_deleted: 2,
                users_reset: 2,
                candidates_votes_reset: 1,
            }
        );
        assert_eq!(votes(&db, &candidate).await, 0);
        assert!(db.list_voters().await.unwrap().iter().all(|v| !v.has_voted));
        assert_eq!(db.list_positions(None).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn reconcile_repairs_partial_commits() {
        let store = MemoryStore::default();
        let db = Db::new(store.clone());
        let state = ElectionState::default();
        state.set_voting_open(true);
        let position = db.insert_position(&PositionCore::example2()).await.unwrap();
        let mut candidates = Vec::new();
        for name in ["Ada", "Alan"] {
            let candidate = CandidateCore::new(name, "Example", position.id, None);
            candidates.push(db.insert_candidate(&candidate).await.unwrap());
        }
        let caster = VoteCaster::new(db.clone(), state);
        let first = db.insert_voter(&VoterCore::example()).await.unwrap();
        let second = db.insert_voter(&VoterCore::example2()).await.unwrap();

        // First ballot loses its tally, second loses its voter flag.
        store.fail_next(FailPoint::IncrementVotes).await;
        let both = Selections::new(vec![(position.id, vec![candidates[0].id, candidates[1].id])]);
        assert!(matches!(
            caster.cast(first.id, both).await,
            Err(Error::PartialCommit { .. })
        ));
        store.fail_next(FailPoint::MarkVoted).await;
        let one = Selections::new(vec![(position.id, vec![candidates[0].id])]);
        assert!(matches!(
            caster.cast(second.id, one).await,
            Err(Error::PartialCommit { .. })
        ));
        assert_eq!(votes(&db, &candidates[0]).await, 1);
        assert_eq!(votes(&db, &candidates[1]).await, 0);

        let cycle = ElectionCycle::new(db.clone());
        let summary = cycle.reconcile(Id::new()).await.unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                candidates_recounted: 2,
                voters_flagged: 2,
            }
        );
        assert_eq!(votes(&db, &candidates[0]).await, 2);
        assert_eq!(votes(&db, &candidates[1]).await, 1);
        assert!(db.find_voter(first.id).await.unwrap().unwrap().has_voted);
        assert!(db.find_voter(second.id).await.unwrap().unwrap().has_voted);

        // Nothing left to repair.
        assert_eq!(
            cycle.reconcile(Id::new()).await.unwrap(),
            ReconcileSummary::default()
        );
    }
}
