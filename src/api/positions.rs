use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    election::PositionRegistry,
    error::Result,
    model::{
        api::position::{PositionDescription, PositionPatch, PositionSpec},
        auth::{Admin, AuthToken},
        db::position::PositionStatus,
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        list_positions,
        create_position,
        get_position,
        update_position,
        delete_position,
    ]
}

#[get("/positions?<status>")]
pub async fn list_positions(
    status: Option<PositionStatus>,
    registry: PositionRegistry,
) -> Result<Json<Vec<PositionDescription>>> {
    let positions = registry.list(status).await?;
    Ok(Json(positions.into_iter().map(Into::into).collect()))
}

#[post("/positions", data = "<spec>", format = "json")]
pub async fn create_position(
    _token: AuthToken<Admin>,
    spec: Json<PositionSpec>,
    registry: PositionRegistry,
) -> Result<(Status, Json<PositionDescription>)> {
    let position = registry.create(spec.0).await?;
    Ok((Status::Created, Json(position.into())))
}

#[get("/positions/<id>")]
pub async fn get_position(
    _token: AuthToken<Admin>,
    id: Id,
    registry: PositionRegistry,
) -> Result<Json<PositionDescription>> {
    Ok(Json(registry.get(id).await?.into()))
}

#[put("/positions/<id>", data = "<patch>", format = "json")]
pub async fn update_position(
    _token: AuthToken<Admin>,
    id: Id,
    patch: Json<PositionPatch>,
    registry: PositionRegistry,
) -> Result<Json<PositionDescription>> {
    Ok(Json(registry.update(id, patch.0).await?.into()))
}

#[delete("/positions/<id>")]
pub async fn delete_position(
    _token: AuthToken<Admin>,
    id: Id,
    registry: PositionRegistry,
) -> Result<()> {
    registry.delete(id).await
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::serde_json::{self, json},
    };

    use crate::model::db::candidate::CandidateCore;
    use crate::store::Db;

    use super::*;

    async fn create(client: &Client, spec: &PositionSpec) -> PositionDescription {
        let response = client
            .post(uri!("/api", create_position))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[backend_test(admin)]
    async fn create_and_list(client: Client) {
        create(&client, &PositionSpec::example2()).await;
        let president = create(&client, &PositionSpec::example()).await;
        assert_eq!(president.name, "President");
        assert_eq!(president.min_winners, 1);

        let response = client
            .get("/api/positions?status=active")
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let positions: Vec<PositionDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let names = positions.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["President", "Board Member"]);
    }

    #[backend_test(admin)]
    async fn invalid_positions_are_rejected(client: Client) {
        create(&client, &PositionSpec::example()).await;

        let response = client
            .post(uri!("/api", create_position))
            .header(ContentType::JSON)
            .body(json!(PositionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        let response = client
            .post(uri!("/api", create_position))
            .header(ContentType::JSON)
            .body(json!({ "name": "Treasurer", "minSelectable": 2, "maxSelectable": 1 }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        let response = client
            .post(uri!("/api", create_position))
            .header(ContentType::JSON)
            .body(json!({ "description": "nameless" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn update_and_delete(client: Client, db: Db) {
        let position = create(&client, &PositionSpec::example2()).await;
        let id: Id = position.id.into();

        let response = client
            .put(uri!("/api", update_position(id)))
            .header(ContentType::JSON)
            .body(json!({ "maxSelectable": 4, "status": "inactive" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let updated: PositionDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(updated.max_selectable, 4);
        assert_eq!(updated.status, PositionStatus::Inactive);

        // Blocked while a candidate stands for it.
        let candidate = db
            .insert_candidate(&CandidateCore::new("Ada", "Lovelace", id, None))
            .await
            .unwrap();
        let response = client
            .delete(uri!("/api", delete_position(id)))
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());

        db.delete_candidate(candidate.id).await.unwrap();
        let response = client
            .delete(uri!("/api", delete_position(id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!("/api", get_position(id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn voters_cannot_manage_positions(client: Client) {
        let response = client
            .post(uri!("/api", create_position))
            .header(ContentType::JSON)
            .body(json!(PositionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        // Listing is public.
        let response = client
            .get(uri!("/api", list_positions(_)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    #[backend_test]
    async fn anonymous_users_cannot_manage_positions(client: Client) {
        let response = client
            .post(uri!("/api", create_position))
            .header(ContentType::JSON)
            .body(json!(PositionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
