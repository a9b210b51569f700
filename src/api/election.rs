use rocket::{serde::json::Json, Route};

use crate::{
    election::ElectionState,
    model::{
        api::election::VotingStatus,
        auth::{AuthToken, User},
    },
};

pub fn routes() -> Vec<Route> {
    routes![election_status]
}

#[get("/election/status")]
pub fn election_status(_token: AuthToken<User>, state: ElectionState) -> Json<VotingStatus> {
    Json(VotingStatus {
        is_voting_open: state.is_voting_open(),
    })
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status, local::asynchronous::Client, serde::json::serde_json,
    };

    use super::*;

    #[backend_test(voter)]
    async fn reports_voting_flag(client: Client) {
        for open in [false, true] {
            client
                .rocket()
                .state::<ElectionState>()
                .unwrap()
                .set_voting_open(open);
            let response = client.get(uri!("/api", election_status)).dispatch().await;
            assert_eq!(Status::Ok, response.status());
            let status: VotingStatus =
                serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
            assert_eq!(status.is_voting_open, open);
        }
    }

    #[backend_test]
    async fn requires_sign_in(client: Client) {
        let response = client.get(uri!("/api", election_status)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
