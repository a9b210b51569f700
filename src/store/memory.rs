use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        ballot::{Ballot, NewBallot},
        candidate::{Candidate, NewCandidate},
        position::{NewPosition, Position, PositionStatus},
        voter::{NewVoter, Role, Voter},
    },
    mongodb::Id,
};

use super::{BallotStore, CandidateFilter, CandidateStore, PositionStore, VoterStore};

/// Operations that can be made to fail once, to exercise partial commits.
#[cfg(test)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailPoint {
    IncrementVotes,
    MarkVoted,
}

#[derive(Default)]
struct Tables {
    positions: BTreeMap<Id, Position>,
    candidates: BTreeMap<Id, Candidate>,
    voters: BTreeMap<Id, Voter>,
    ballots: BTreeMap<Id, Ballot>,
    #[cfg(test)]
    fail_points: BTreeSet<FailPoint>,
}

impl Tables {
    #[cfg(test)]
    fn check_fail_point(&mut self, point: FailPoint) -> Result<()> {
        if self.fail_points.remove(&point) {
            return Err(Error::Internal(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn name_taken(&self, name: &str, except: Option<Id>) -> bool {
        self.positions
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }
}

/// A store held entirely in process memory.
///
/// Every operation takes one lock over all collections, so each operation is
/// atomic. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Make the next call to the given operation fail.
    #[cfg(test)]
    pub async fn fail_next(&self, point: FailPoint) {
        self.tables.lock().await.fail_points.insert(point);
    }
}

#[rocket::async_trait]
impl PositionStore for MemoryStore {
    async fn insert_position(&self, position: &NewPosition) -> Result<Position> {
        let mut tables = self.tables.lock().await;
        if tables.name_taken(&position.name, None) {
            return Err(Error::DuplicateName(position.name.clone()));
        }
        let position = Position {
            id: Id::new(),
            position: position.clone(),
        };
        tables.positions.insert(position.id, position.clone());
        Ok(position)
    }

    async fn find_position(&self, id: Id) -> Result<Option<Position>> {
        Ok(self.tables.lock().await.positions.get(&id).cloned())
    }

    async fn list_positions(&self, status: Option<PositionStatus>) -> Result<Vec<Position>> {
        let tables = self.tables.lock().await;
        let mut positions = tables
            .positions
            .values()
            .filter(|p| status.map_or(true, |status| p.status == status))
            .cloned()
            .collect::<Vec<_>>();
        positions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(positions)
    }

    async fn replace_position(&self, position: &Position) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.positions.contains_key(&position.id) {
            return Ok(false);
        }
        if tables.name_taken(&position.name, Some(position.id)) {
            return Err(Error::DuplicateName(position.name.clone()));
        }
        tables.positions.insert(position.id, position.clone());
        Ok(true)
    }

    async fn delete_position(&self, id: Id) -> Result<bool> {
        Ok(self.tables.lock().await.positions.remove(&id).is_some())
    }
}

#[rocket::async_trait]
impl CandidateStore for MemoryStore {
    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<Candidate> {
        let candidate = Candidate {
            id: Id::new(),
            candidate: candidate.clone(),
        };
        self.tables
            .lock()
            .await
            .candidates
            .insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.tables.lock().await.candidates.get(&id).cloned())
    }

    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .values()
            .filter(|c| filter.position.map_or(true, |position| c.position == position))
            .filter(|c| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |search| c.matches_search(search))
            })
            .cloned()
            .collect())
    }

    async fn save_candidate_details(&self, candidate: &Candidate) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.candidates.get_mut(&candidate.id) {
            Some(stored) => {
                let votes = stored.votes;
                stored.candidate = candidate.candidate.clone();
                stored.votes = votes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        Ok(self.tables.lock().await.candidates.remove(&id).is_some())
    }

    async fn count_candidates_for(&self, position: Id) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .values()
            .filter(|c| c.position == position)
            .count() as u64)
    }

    async fn increment_votes(&self, ids: &[Id]) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        #[cfg(test)]
        tables.check_fail_point(FailPoint::IncrementVotes)?;

        let mut matched = 0;
        for id in ids.iter().collect::<BTreeSet<_>>() {
            if let Some(candidate) = tables.candidates.get_mut(id) {
                candidate.votes += 1;
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn set_votes(&self, id: Id, votes: u64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.candidates.get_mut(&id) {
            Some(candidate) => {
                candidate.votes = votes;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset_all_votes(&self) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let mut changed = 0;
        for candidate in tables.candidates.values_mut().filter(|c| c.votes != 0) {
            candidate.votes = 0;
            changed += 1;
        }
        Ok(changed)
    }
}

#[rocket::async_trait]
impl VoterStore for MemoryStore {
    async fn insert_voter(&self, voter: &NewVoter) -> Result<Voter> {
        let mut tables = self.tables.lock().await;
        if tables
            .voters
            .values()
            .any(|v| v.company_id == voter.company_id)
        {
            return Err(Error::DuplicateCompanyId(voter.company_id.clone()));
        }
        let voter = Voter {
            id: Id::new(),
            voter: voter.clone(),
        };
        tables.voters.insert(voter.id, voter.clone());
        Ok(voter)
    }

    async fn find_voter(&self, id: Id) -> Result<Option<Voter>> {
        Ok(self.tables.lock().await.voters.get(&id).cloned())
    }

    async fn find_voter_by_company_id(&self, company_id: &str) -> Result<Option<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .values()
            .find(|v| v.company_id == company_id)
            .cloned())
    }

    async fn list_voters(&self) -> Result<Vec<Voter>> {
        Ok(self.tables.lock().await.voters.values().cloned().collect())
    }

    async fn count_admins(&self) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .values()
            .filter(|v| v.role == Role::Admin)
            .count() as u64)
    }

    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.voters.get_mut(&id) {
            Some(voter) => {
                voter.password_hash = password_hash;
                voter.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_voted(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        #[cfg(test)]
        tables.check_fail_point(FailPoint::MarkVoted)?;

        match tables.voters.get_mut(&id) {
            Some(voter) if !voter.has_voted => {
                voter.has_voted = true;
                voter.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_all_voted(&self) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let mut changed = 0;
        for voter in tables.voters.values_mut().filter(|v| v.has_voted) {
            voter.has_voted = false;
            voter.updated_at = Utc::now();
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_voters_with_role(&self, role: Role) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.voters.len();
        tables.voters.retain(|_, v| v.role != role);
        Ok((before - tables.voters.len()) as u64)
    }
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn insert_ballot(&self, ballot: &NewBallot) -> Result<Ballot> {
        let mut tables = self.tables.lock().await;
        if tables.ballots.values().any(|b| b.voter == ballot.voter) {
            return Err(Error::AlreadyVoted);
        }
        let ballot = Ballot {
            id: Id::new(),
            ballot: ballot.clone(),
        };
        tables.ballots.insert(ballot.id, ballot.clone());
        Ok(ballot)
    }

    async fn find_ballot_for_voter(&self, voter: Id) -> Result<Option<Ballot>> {
        let tables = self.tables.lock().await;
        Ok(tables.ballots.values().find(|b| b.voter == voter).cloned())
    }

    async fn list_ballots(&self) -> Result<Vec<Ballot>> {
        Ok(self.tables.lock().await.ballots.values().cloned().collect())
    }

    async fn delete_all_ballots(&self) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let deleted = tables.ballots.len() as u64;
        tables.ballots.clear();
        Ok(deleted)
    }
}
