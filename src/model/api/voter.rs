use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::voter::{Role, Voter},
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 3;

/// A self-service registration request. The password is plaintext and never stored.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_id: Option<String>,
    pub password: Option<String>,
}

/// Raw login credentials, received from a user.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub company_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// A user as returned by the API, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterDescription {
    pub id: ApiId,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub company_id: String,
    pub has_voted: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Voter> for VoterDescription {
    fn from(voter: Voter) -> Self {
        let full_name = voter.full_name();
        let core = voter.voter;
        Self {
            id: voter.id.into(),
            first_name: core.first_name,
            last_name: core.last_name,
            full_name,
            company_id: core.company_id,
            has_voted: core.has_voted,
            role: core.role,
            created_at: core.created_at,
        }
    }
}

/// The response to a successful registration or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: VoterDescription,
}

/// Whether the signed-in user has voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
}
