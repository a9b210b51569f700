use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};

#[derive(Debug, Default)]
struct Flags {
    voting_open: AtomicBool,
    registration_open: AtomicBool,
}

/// Election-wide flags. Both start closed and are not persisted across restarts.
///
/// Clones share the same flags.
#[derive(Debug, Clone, Default)]
pub struct ElectionState(Arc<Flags>);

impl ElectionState {
    pub fn is_voting_open(&self) -> bool {
        self.0.voting_open.load(Ordering::SeqCst)
    }

    pub fn set_voting_open(&self, open: bool) {
        let was = self.0.voting_open.swap(open, Ordering::SeqCst);
        if was != open {
            info!("Voting {}", if open { "opened" } else { "closed" });
        }
    }

    pub fn is_registration_open(&self) -> bool {
        self.0.registration_open.load(Ordering::SeqCst)
    }

    pub fn set_registration_open(&self, open: bool) {
        let was = self.0.registration_open.swap(open, Ordering::SeqCst);
        if was != open {
            info!(
                "Registration {}",
                if open { "enabled" } else { "disabled" }
            );
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ElectionState {
    type Error = ();

    /// Panics iff the [`ElectionState`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = req.guard::<&State<ElectionState>>().await.unwrap();
        Outcome::Success(state.inner().clone())
    }
}
