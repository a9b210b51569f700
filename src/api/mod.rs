use rocket::Route;

pub mod admin;
pub mod auth;
pub mod candidates;
pub mod election;
pub mod positions;
pub mod votes;

/// Every API route, to be mounted under `/api`.
pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(positions::routes());
    routes.extend(candidates::routes());
    routes.extend(votes::routes());
    routes.extend(election::routes());
    routes.extend(admin::routes());
    routes
}
