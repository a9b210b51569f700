use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    election::CandidateRegistry,
    error::Result,
    model::{
        api::candidate::{CandidateDescription, CandidatePatch, CandidateSpec},
        auth::{Admin, AuthToken},
        mongodb::Id,
    },
    store::CandidateFilter,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_candidates,
        get_candidate,
        create_candidate,
        update_candidate,
        delete_candidate,
    ]
}

#[get("/candidates?<search>&<position>")]
pub async fn list_candidates(
    search: Option<String>,
    position: Option<Id>,
    registry: CandidateRegistry,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = registry.list(CandidateFilter { search, position }).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[get("/candidates/<id>")]
pub async fn get_candidate(
    id: Id,
    registry: CandidateRegistry,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(registry.get(id).await?.into()))
}

#[post("/candidates", data = "<spec>", format = "json")]
pub async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    registry: CandidateRegistry,
) -> Result<(Status, Json<CandidateDescription>)> {
    let candidate = registry.create(spec.0).await?;
    Ok((Status::Created, Json(candidate.into())))
}

#[patch("/candidates/<id>", data = "<patch>", format = "json")]
pub async fn update_candidate(
    _token: AuthToken<Admin>,
    id: Id,
    patch: Json<CandidatePatch>,
    registry: CandidateRegistry,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(registry.update(id, patch.0).await?.into()))
}

#[delete("/candidates/<id>")]
pub async fn delete_candidate(
    _token: AuthToken<Admin>,
    id: Id,
    registry: CandidateRegistry,
) -> Result<Status> {
    registry.delete(id).await?;
    Ok(Status::NoContent)
}
