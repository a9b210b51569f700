use rocket::{serde::json::Json, Route};

use crate::{
    election::{ElectionCycle, ElectionState, VoterDirectory},
    error::Result,
    model::{
        api::{
            election::{
                ClearSummary, DeleteSummary, ReconcileSummary, RegistrationStatus, VotingStatus,
            },
            voter::VoterDescription,
        },
        auth::{Admin, AuthToken},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        registration_status,
        voting_status,
        open_voting,
        close_voting,
        enable_registration,
        disable_registration,
        clear_database,
        reconcile,
        get_voters,
        delete_voters,
    ]
}

fn voting(state: &ElectionState) -> Json<VotingStatus> {
    Json(VotingStatus {
        is_voting_open: state.is_voting_open(),
    })
}

fn registration(state: &ElectionState) -> Json<RegistrationStatus> {
    Json(RegistrationStatus {
        is_registration_open: state.is_registration_open(),
    })
}

/// Public, so the sign-up page knows whether to offer registration.
#[get("/admin/registration-status")]
pub fn registration_status(state: ElectionState) -> Json<RegistrationStatus> {
    registration(&state)
}

#[get("/admin/voting-status")]
pub fn voting_status(_token: AuthToken<Admin>, state: ElectionState) -> Json<VotingStatus> {
    voting(&state)
}

#[post("/admin/open-voting")]
pub fn open_voting(_token: AuthToken<Admin>, state: ElectionState) -> Json<VotingStatus> {
    state.set_voting_open(true);
    voting(&state)
}

#[post("/admin/close-voting")]
pub fn close_voting(_token: AuthToken<Admin>, state: ElectionState) -> Json<VotingStatus> {
    state.set_voting_open(false);
    voting(&state)
}

#[post("/admin/enable-registration")]
pub fn enable_registration(
    _token: AuthToken<Admin>,
    state: ElectionState,
) -> Json<RegistrationStatus> {
    state.set_registration_open(true);
    registration(&state)
}

#[post("/admin/disable-registration")]
pub fn disable_registration(
    _token: AuthToken<Admin>,
    state: ElectionState,
) -> Json<RegistrationStatus> {
    state.set_registration_open(false);
    registration(&state)
}

#[post("/admin/clear-database")]
pub async fn clear_database(
    token: AuthToken<Admin>,
    cycle: ElectionCycle,
) -> Result<Json<ClearSummary>> {
    Ok(Json(cycle.clear(token.id).await?))
}

#[post("/admin/reconcile")]
pub async fn reconcile(
    token: AuthToken<Admin>,
    cycle: ElectionCycle,
) -> Result<Json<ReconcileSummary>> {
    Ok(Json(cycle.reconcile(token.id).await?))
}

#[get("/admin/voters")]
pub async fn get_voters(
    _token: AuthToken<Admin>,
    directory: VoterDirectory,
) -> Result<Json<Vec<VoterDescription>>> {
    let voters = directory.list().await?;
    Ok(Json(voters.into_iter().map(Into::into).collect()))
}

/// Remove every account with the voter role. Admins are kept.
#[delete("/admin/voters")]
pub async fn delete_voters(
    _token: AuthToken<Admin>,
    directory: VoterDirectory,
) -> Result<Json<DeleteSummary>> {
    Ok(Json(DeleteSummary {
        deleted: directory.delete_voters().await?,
    }))
}
