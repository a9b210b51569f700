//! The persistence boundary.
//!
//! Each collection has its own trait; [`Store`] bundles them so a single
//! handle can be placed in managed state. MongoDB backs production, and the
//! in-memory store backs tests and local runs without a database.

use std::ops::Deref;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{
    db::{
        ballot::{Ballot, NewBallot},
        candidate::{Candidate, NewCandidate},
        position::{NewPosition, Position, PositionStatus},
        voter::{NewVoter, Role, Voter},
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
#[cfg(test)]
pub use memory::FailPoint;
pub use mongo::MongoStore;

#[rocket::async_trait]
pub trait PositionStore: Send + Sync {
    /// Insert a position. Fails with `DuplicateName` if the name is taken.
    async fn insert_position(&self, position: &NewPosition) -> Result<Position>;

    async fn find_position(&self, id: Id) -> Result<Option<Position>>;

    /// All positions, optionally filtered by status, sorted by `order` then `name`.
    async fn list_positions(&self, status: Option<PositionStatus>) -> Result<Vec<Position>>;

    /// Overwrite a stored position. Returns false if it no longer exists.
    async fn replace_position(&self, position: &Position) -> Result<bool>;

    async fn delete_position(&self, id: Id) -> Result<bool>;
}

/// Filters for listing candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    /// Case-insensitive substring of either name.
    pub search: Option<String>,
    pub position: Option<Id>,
}

#[rocket::async_trait]
pub trait CandidateStore: Send + Sync {
    async fn insert_candidate(&self, candidate: &NewCandidate) -> Result<Candidate>;

    async fn find_candidate(&self, id: Id) -> Result<Option<Candidate>>;

    /// Candidates matching the filter, in creation order.
    async fn list_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Candidate>>;

    /// Save everything except the vote counter, which only moves through
    /// [`increment_votes`](Self::increment_votes) and friends.
    async fn save_candidate_details(&self, candidate: &Candidate) -> Result<bool>;

    async fn delete_candidate(&self, id: Id) -> Result<bool>;

    async fn count_candidates_for(&self, position: Id) -> Result<u64>;

    /// Add one vote to each candidate. Returns how many candidates matched.
    async fn increment_votes(&self, ids: &[Id]) -> Result<u64>;

    async fn set_votes(&self, id: Id, votes: u64) -> Result<bool>;

    /// Zero every counter. Returns how many counters changed.
    async fn reset_all_votes(&self) -> Result<u64>;
}

#[rocket::async_trait]
pub trait VoterStore: Send + Sync {
    /// Insert a user. Fails with `DuplicateCompanyId` if the company ID is taken.
    async fn insert_voter(&self, voter: &NewVoter) -> Result<Voter>;

    async fn find_voter(&self, id: Id) -> Result<Option<Voter>>;

    async fn find_voter_by_company_id(&self, company_id: &str) -> Result<Option<Voter>>;

    async fn list_voters(&self) -> Result<Vec<Voter>>;

    async fn count_admins(&self) -> Result<u64>;

    async fn set_password_hash(&self, id: Id, password_hash: String) -> Result<bool>;

    /// Flag a user as having voted. Returns true if the flag changed.
    async fn mark_voted(&self, id: Id) -> Result<bool>;

    /// Clear every user's voted flag. Returns how many flags changed.
    async fn reset_all_voted(&self) -> Result<u64>;

    async fn delete_voters_with_role(&self, role: Role) -> Result<u64>;
}

#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    /// Record a ballot. Fails with `AlreadyVoted` if the voter already has one.
    async fn insert_ballot(&self, ballot: &NewBallot) -> Result<Ballot>;

    async fn find_ballot_for_voter(&self, voter: Id) -> Result<Option<Ballot>>;

    async fn list_ballots(&self) -> Result<Vec<Ballot>>;

    async fn delete_all_ballots(&self) -> Result<u64>;
}

/// Every collection behind one handle.
pub trait Store: PositionStore + CandidateStore + VoterStore + BallotStore {}

impl<T> Store for T where T: PositionStore + CandidateStore + VoterStore + BallotStore {}

/// Shared handle on the store, held in managed state.
#[derive(Clone)]
pub struct Db(Arc<dyn Store>);

impl Db {
    pub fn new<S: Store + 'static>(store: S) -> Self {
        Self(Arc::new(store))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Db {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Implement `FromRequest` for a service built from the managed [`Db`] with `Self::new(db)`.
///
/// Panics iff the [`Db`] is not managed by [`rocket::Rocket`].
macro_rules! store_guard {
    ($service:ty) => {
        #[rocket::async_trait]
        impl<'r> rocket::request::FromRequest<'r> for $service {
            type Error = ();

            async fn from_request(
                req: &'r rocket::Request<'_>,
            ) -> rocket::request::Outcome<Self, Self::Error> {
                let db = req
                    .guard::<&rocket::State<crate::store::Db>>()
                    .await
                    .unwrap();
                rocket::request::Outcome::Success(Self::new(db.inner().clone()))
            }
        }
    };
}

pub(crate) use store_guard;
