//! The election services. Each is a request guard built over the managed store.

mod candidates;
mod casting;
mod cycle;
mod ledger;
mod positions;
mod results;
mod state;
mod voters;

pub use candidates::CandidateRegistry;
pub use casting::VoteCaster;
pub use cycle::ElectionCycle;
pub use ledger::VoteLedger;
pub use positions::PositionRegistry;
pub use results::ResultsAggregator;
pub use state::ElectionState;
pub use voters::{ensure_admin_exists, VoterDirectory};
