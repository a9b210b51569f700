use log::{error, info};
use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::error::{CommitStage, Error, Result};
use crate::model::{
    db::ballot::{Ballot, Selections},
    mongodb::Id,
};
use crate::store::Db;

use super::{ledger::VoteLedger, state::ElectionState};

/// Validates and commits ballots.
///
/// Committing is three writes with no transaction around them: the ballot is
/// recorded, then the tallies are incremented, then the voter is flagged. The
/// ballot's unique voter key is what prevents double voting, so a failure in
/// either later write leaves a recorded ballot and is reported as
/// [`Error::PartialCommit`] for an administrator to reconcile.
pub struct VoteCaster {
    db: Db,
    ledger: VoteLedger,
    state: ElectionState,
}

impl VoteCaster {
    pub fn new(db: Db, state: ElectionState) -> Self {
        Self {
            ledger: VoteLedger::new(db.clone()),
            db,
            state,
        }
    }

    pub async fn cast(&self, voter: Id, selections: Selections) -> Result<Ballot> {
        self.validate(voter, &selections).await?;

        let ballot = self.ledger.record_ballot(voter, selections).await?;

        if let Err(source) = self.apply_tally(&ballot).await {
            return Err(self.partial_commit(&ballot, CommitStage::Tally, source));
        }
        if let Err(source) = self.flag_voter(voter).await {
            return Err(self.partial_commit(&ballot, CommitStage::VoterFlag, source));
        }

        info!(
            "Voter {voter} cast ballot {} selecting {} candidate(s)",
            ballot.id,
            ballot.selections.total_selected()
        );
        Ok(ballot)
    }

    /// Every check that must pass before anything is written.
    async fn validate(&self, voter_id: Id, selections: &Selections) -> Result<()> {
        if !self.state.is_voting_open() {
            return Err(Error::VotingClosed);
        }

        let voter = self
            .db
            .find_voter(voter_id)
            .await?
            .ok_or(Error::VoterNotFound(voter_id))?;
        if voter.has_voted || self.ledger.has_voted(voter_id).await? {
            return Err(Error::AlreadyVoted);
        }

        if selections.is_empty() {
            return Err(Error::EmptyBallot);
        }

        for (position_id, candidates) in selections.iter() {
            let position = self
                .db
                .find_position(*position_id)
                .await?
                .filter(|p| p.is_active())
                .ok_or(Error::InvalidPosition(*position_id))?;

            position.check_selection_count(candidates.len())?;

            for candidate_id in candidates {
                let stands_here = self
                    .db
                    .find_candidate(*candidate_id)
                    .await?
                    .map_or(false, |c| c.position == *position_id);
                if !stands_here {
                    return Err(Error::InvalidCandidate {
                        candidate: *candidate_id,
                        position: position.position.name,
                    });
                }
            }
        }

        if selections.total_selected() == 0 {
            return Err(Error::EmptyBallot);
        }
        Ok(())
    }

    async fn apply_tally(&self, ballot: &Ballot) -> Result<()> {
        let ids = ballot.selections.candidates().collect::<Vec<_>>();
        let matched = self.db.increment_votes(&ids).await?;
        if matched != ids.len() as u64 {
            return Err(Error::not_found(format!(
                "{} of {} selected candidates",
                ids.len() as u64 - matched,
                ids.len()
            )));
        }
        Ok(())
    }

    async fn flag_voter(&self, voter: Id) -> Result<()> {
        if self.db.mark_voted(voter).await? {
            return Ok(());
        }
        // Not changed: either already flagged, or the voter has vanished.
        match self.db.find_voter(voter).await? {
            Some(v) if v.has_voted => Ok(()),
            _ => Err(Error::VoterNotFound(voter)),
        }
    }

    fn partial_commit(&self, ballot: &Ballot, stage: CommitStage, source: Error) -> Error {
        error!(
            "PARTIAL COMMIT: ballot {} for voter {} recorded but {stage} failed: {source}",
            ballot.id, ballot.voter
        );
        Error::PartialCommit {
            ballot: ballot.id,
            stage,
            source: Box::new(source),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoteCaster {
    type Error = ();

    /// Panics iff the [`Db`] or [`ElectionState`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Db>>().await.unwrap();
        let state = req.guard::<&State<ElectionState>>().await.unwrap();
        Outcome::Success(Self::new(db.inner().clone(), state.inner().clone()))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::{
        candidate::{Candidate, CandidateCore},
        position::{Position, PositionCore, PositionStatus},
        voter::{Voter, VoterCore},
    };
    use crate::store::{FailPoint, MemoryStore};

    use super::*;

    struct Fixture {
        store: MemoryStore,
        db: Db,
        caster: VoteCaster,
        /// Choose exactly one.
        president: Position,
        /// Choose one or two.
        board: Position,
        president_candidates: Vec<Candidate>,
        board_candidates: Vec<Candidate>,
        voter: Voter,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::default();
        let db = Db::new(store.clone());
        let state = ElectionState::default();
        state.set_voting_open(true);

        let president = db.insert_position(&PositionCore::example()).await.unwrap();
        let board = db.insert_position(&PositionCore::example2()).await.unwrap();
        let mut president_candidates = Vec::new();
        for (first, last) in [("Ada", "Lovelace"), ("Alan", "Turing")] {
            let candidate = CandidateCore::new(first, last, president.id, None);
            president_candidates.push(db.insert_candidate(&candidate).await.unwrap());
        }
        let mut board_candidates = Vec::new();
        for (first, last) in [("Grace", "Hopper"), ("Edsger", "Dijkstra"), ("Barbara", "Liskov")] {
            let candidate = CandidateCore::new(first, last, board.id, None);
            board_candidates.push(db.insert_candidate(&candidate).await.unwrap());
        }
        let voter = db.insert_voter(&VoterCore::example()).await.unwrap();

        Fixture {
            store,
            caster: VoteCaster::new(db.clone(), state),
            db,
            president,
            board,
            president_candidates,
            board_candidates,
            voter,
        }
    }

    impl Fixture {
        fn valid_selections(&self) -> Selections {
            Selections::new(vec![
                (self.president.id, vec![self.president_candidates[0].id]),
                (
                    self.board.id,
                    vec![self.board_candidates[0].id, self.board_candidates[2].id],
                ),
            ])
        }

        async fn votes(&self, candidate: &Candidate) -> u64 {
            self.db
                .find_candidate(candidate.id)
                .await
                .unwrap()
                .unwrap()
                .votes
        }

        async fn voter_flagged(&self) -> bool {
            self.db
                .find_voter(self.voter.id)
                .await
                .unwrap()
                .unwrap()
                .has_voted
        }

        /// Nothing has been written by a rejected ballot.
        async fn assert_untouched(&self) {
            assert!(self.db.list_ballots().await.unwrap().is_empty());
            for candidate in self.president_candidates.iter().chain(&self.board_candidates) {
                assert_eq!(self.votes(candidate).await, 0);
            }
            assert!(!self.voter_flagged().await);
        }
    }

    #[rocket::async_test]
    async fn valid_ballot_is_committed() {
        let f = fixture().await;
        let ballot = f
            .caster
            .cast(f.voter.id, f.valid_selections())
            .await
            .unwrap();

        assert_eq!(ballot.voter, f.voter.id);
        assert_eq!(ballot.selections, f.valid_selections());
        assert_eq!(f.votes(&f.president_candidates[0]).await, 1);
        assert_eq!(f.votes(&f.president_candidates[1]).await, 0);
        assert_eq!(f.votes(&f.board_candidates[0]).await, 1);
        assert_eq!(f.votes(&f.board_candidates[1]).await, 0);
        assert_eq!(f.votes(&f.board_candidates[2]).await, 1);
        assert!(f.voter_flagged().await);
        assert_eq!(f.db.list_ballots().await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn closed_voting_is_rejected_first() {
        let f = fixture().await;
        f.caster.state.set_voting_open(false);
        assert!(matches!(
            f.caster.cast(Id::new(), Selections::default()).await,
            Err(Error::VotingClosed)
        ));
    }

    #[rocket::async_test]
    async fn unknown_voter_is_rejected() {
        let f = fixture().await;
        let stranger = Id::new();
        assert!(matches!(
            f.caster.cast(stranger, f.valid_selections()).await,
            Err(Error::VoterNotFound(id)) if id == stranger
        ));
        f.assert_untouched().await;
    }

    #[rocket::async_test]
    async fn second_ballot_is_rejected() {
        let f = fixture().await;
        f.caster
            .cast(f.voter.id, f.valid_selections())
            .await
            .unwrap();
        assert!(matches!(
            f.caster.cast(f.voter.id, f.valid_selections()).await,
            Err(Error::AlreadyVoted)
        ));
        assert_eq!(f.votes(&f.president_candidates[0]).await, 1);
        assert_eq!(f.db.list_ballots().await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn concurrent_ballots_from_one_voter_commit_once() {
        let f = fixture().await;
        let (first, second) = rocket::futures::join!(
            f.caster.cast(f.voter.id, f.valid_selections()),
            f.caster.cast(f.voter.id, f.valid_selections()),
        );

        let (committed, rejected) = match (first, second) {
            (Ok(ballot), Err(e)) | (Err(e), Ok(ballot)) => (ballot, e),
            (first, second) => panic!("expected one success, got {first:?} and {second:?}"),
        };
        assert_eq!(committed.voter, f.voter.id);
        assert!(matches!(rejected, Error::AlreadyVoted));

        assert_eq!(f.db.list_ballots().await.unwrap().len(), 1);
        assert_eq!(f.votes(&f.president_candidates[0]).await, 1);
        assert_eq!(f.votes(&f.board_candidates[0]).await, 1);
        assert_eq!(f.votes(&f.board_candidates[2]).await, 1);
        assert!(f.voter_flagged().await);
    }

    #[rocket::async_test]
    async fn empty_ballots_are_rejected() {
        let f = fixture().await;
        assert!(matches!(
            f.caster.cast(f.voter.id, Selections::default()).await,
            Err(Error::EmptyBallot)
        ));

        // Positions allowing zero selections still need one selection overall.
        let mut optional = PositionCore::example();
        optional.name = "Observer".to_string();
        optional.min_selectable = 0;
        let optional = f.db.insert_position(&optional).await.unwrap();
        assert!(matches!(
            f.caster
                .cast(f.voter.id, Selections::new(vec![(optional.id, vec![])]))
                .await,
            Err(Error::EmptyBallot)
        ));
        f.assert_untouched().await;
    }

    #[rocket::async_test]
    async fn unknown_or_inactive_positions_are_rejected() {
        let f = fixture().await;
        let unknown = Id::new();
        assert!(matches!(
            f.caster
                .cast(f.voter.id, Selections::new(vec![(unknown, vec![Id::new()])]))
                .await,
            Err(Error::InvalidPosition(id)) if id == unknown
        ));

        let mut inactive = f.president.clone();
        inactive.status = PositionStatus::Inactive;
        f.db.replace_position(&inactive).await.unwrap();
        assert!(matches!(
            f.caster.cast(f.voter.id, f.valid_selections()).await,
            Err(Error::InvalidPosition(id)) if id == f.president.id
        ));
        f.assert_untouched().await;
    }

    #[rocket::async_test]
    async fn selection_counts_are_enforced() {
        let f = fixture().await;
        let too_many = Selections::new(vec![(
            f.board.id,
            f.board_candidates.iter().map(|c| c.id).collect(),
        )]);
        let err = f.caster.cast(f.voter.id, too_many).await.unwrap_err();
        assert!(matches!(
            err,
            Error::SelectionCountViolation {
                ref position,
                min: 1,
                max: 2,
                received: 3,
            } if position == "Board Member"
        ));

        let too_few = Selections::new(vec![(f.president.id, vec![])]);
        assert!(matches!(
            f.caster.cast(f.voter.id, too_few).await,
            Err(Error::SelectionCountViolation { received: 0, .. })
        ));
        f.assert_untouched().await;
    }

    #[rocket::async_test]
    async fn repeated_candidates_count_once() {
        let f = fixture().await;
        let c = f.board_candidates[1].id;
        let selections = Selections::new(vec![(f.board.id, vec![c, c, c])]);
        f.caster.cast(f.voter.id, selections).await.unwrap();
        assert_eq!(f.votes(&f.board_candidates[1]).await, 1);
    }

    #[rocket::async_test]
    async fn candidates_must_stand_for_the_position() {
        let f = fixture().await;
        let wrong = f.board_candidates[0].id;
        let err = f
            .caster
            .cast(
                f.voter.id,
                Selections::new(vec![(f.president.id, vec![wrong])]),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidCandidate { candidate, ref position }
                if candidate == wrong && position == "President"
        ));

        let unknown = Id::new();
        assert!(matches!(
            f.caster
                .cast(f.voter.id, Selections::new(vec![(f.president.id, vec![unknown])]))
                .await,
            Err(Error::InvalidCandidate { candidate, .. }) if candidate == unknown
        ));
        f.assert_untouched().await;
    }

    #[rocket::async_test]
    async fn first_failing_position_is_reported() {
        let f = fixture().await;
        // The second position is invalid; the first is over its limit.
        let selections = Selections::new(vec![
            (
                f.president.id,
                f.president_candidates.iter().map(|c| c.id).collect(),
            ),
            (Id::new(), vec![]),
        ]);
        assert!(matches!(
            f.caster.cast(f.voter.id, selections).await,
            Err(Error::SelectionCountViolation { .. })
        ));
    }

    #[rocket::async_test]
    async fn tally_failure_is_a_partial_commit() {
        let f = fixture().await;
        f.store.fail_next(FailPoint::IncrementVotes).await;

        let err = f
            .caster
            .cast(f.voter.id, f.valid_selections())
            .await
            .unwrap_err();
        let ballot_id = match err {
            Error::PartialCommit {
                ballot,
                stage: CommitStage::Tally,
                ..
            } => ballot,
            other => panic!("unexpected error: {other}"),
        };

        // The ballot stands, so the voter cannot try again.
        let ballots = f.db.list_ballots().await.unwrap();
        assert_eq!(ballots.len(), 1);
        assert_eq!(ballots[0].id, ballot_id);
        assert_eq!(f.votes(&f.president_candidates[0]).await, 0);
        assert!(!f.voter_flagged().await);
        assert!(matches!(
            f.caster.cast(f.voter.id, f.valid_selections()).await,
            Err(Error::AlreadyVoted)
        ));
    }

    #[rocket::async_test]
    async fn voter_flag_failure_is_a_partial_commit() {
        let f = fixture().await;
        f.store.fail_next(FailPoint::MarkVoted).await;

        assert!(matches!(
            f.caster.cast(f.voter.id, f.valid_selections()).await,
            Err(Error::PartialCommit {
                stage: CommitStage::VoterFlag,
                ..
            })
        ));
        assert_eq!(f.votes(&f.president_candidates[0]).await, 1);
        assert!(!f.voter_flagged().await);
    }
}
