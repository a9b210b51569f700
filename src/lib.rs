#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::election::ElectionState;
use crate::logging::LoggerFairing;
use crate::store::Db;

pub mod api;
pub mod config;
pub mod election;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

/// Attach everything except the database.
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(ElectionState::default())
        .mount("/api", api::routes())
}

/// Build the server from `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build()).attach(DatabaseFairing)
}

/// Build a server over an existing store, skipping database setup.
pub fn rocket_with_store(rocket: Rocket<Build>, db: Db) -> Rocket<Build> {
    assemble(rocket).manage(db)
}

/// A tracked client over `db`, with fixed secrets so tests don't depend on the environment.
#[cfg(test)]
pub(crate) async fn test_client(db: Db) -> rocket::local::asynchronous::Client {
    log4rs_test_utils::test_logging::init_logging_once_for(["election_backend"], None, None);

    let figment = rocket::Config::figment()
        .merge(("auth_ttl", 3600))
        .merge(("admin_company_id", "ADMIN"))
        .merge(("jwt_secret", "test secret"))
        .merge(("admin_password", "admin"))
        .merge(("log_level", "off"));
    rocket::local::asynchronous::Client::tracked(rocket_with_store(rocket::custom(figment), db))
        .await
        .unwrap()
}

/// Insert an example account with `role` and sign the client in as it.
#[cfg(test)]
pub(crate) async fn test_login(
    client: &rocket::local::asynchronous::Client,
    db: &Db,
    role: model::db::voter::Role,
) {
    use crate::model::db::voter::{examples::EXAMPLE_PASSWORD, Role, VoterCore};

    let core = match role {
        Role::Admin => VoterCore::example_admin(),
        Role::Voter => VoterCore::example(),
    };
    let company_id = core.company_id.clone();
    db.insert_voter(&core).await.unwrap();

    let response = client
        .post(uri!("/api", api::auth::login))
        .header(rocket::http::ContentType::JSON)
        .body(
            rocket::serde::json::json!({
                "companyId": company_id,
                "password": EXAMPLE_PASSWORD,
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(rocket::http::Status::Ok, response.status());
}
