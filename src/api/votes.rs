use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    election::{ResultsAggregator, VoteCaster, VoterDirectory},
    error::Result,
    model::{
        api::{
            ballot::{BallotDescription, BallotSpec},
            election::ElectionResults,
            voter::VoteStatus,
        },
        auth::{AuthToken, User},
    },
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, results, user_status]
}

#[post("/votes/cast", data = "<ballot>", format = "json")]
pub async fn cast_vote(
    token: AuthToken<User>,
    ballot: Json<BallotSpec>,
    caster: VoteCaster,
) -> Result<(Status, Json<BallotDescription>)> {
    let ballot = caster.cast(token.id, ballot.0.into()).await?;
    Ok((Status::Created, Json(ballot.into())))
}

#[get("/votes/results")]
pub async fn results(
    _token: AuthToken<User>,
    aggregator: ResultsAggregator,
) -> Result<Json<ElectionResults>> {
    Ok(Json(aggregator.results().await?))
}

#[get("/votes/user-status")]
pub async fn user_status(
    token: AuthToken<User>,
    directory: VoterDirectory,
) -> Result<Json<VoteStatus>> {
    let voter = directory.get(token.id).await?;
    Ok(Json(VoteStatus {
        has_voted: voter.has_voted,
    }))
}
