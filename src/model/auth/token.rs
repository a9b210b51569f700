use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    db::voter::{Role, Voter},
    mongodb::Id,
};
use crate::store::Db;

use super::rights::Rights;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// A verified authentication token representing a specific user with the
/// rights `R`.
pub struct AuthToken<R> {
    pub id: Id,
    pub role: Role,
    phantom: PhantomData<R>,
}

/// Encode a signed token for the given user.
pub fn encode_token(voter: &Voter, config: &Config) -> Result<String> {
    let claims = Claims {
        id: voter.id.into(),
        role: voter.role,
        expire_at: Utc::now() + config.auth_ttl(),
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret()),
    )?)
}

/// Wrap an encoded token in a cookie for browser clients.
pub fn token_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(AUTH_TOKEN_COOKIE, token)
        .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .finish()
}

/// Token claims: the user, their role and an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    id: ApiId,
    #[serde(rename = "rgt")]
    role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

impl Claims {
    fn decode(token: &str, config: &Config) -> Result<Self> {
        let claims = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims)?;
        Ok(claims)
    }
}

/// Find the raw token: an `Authorization: Bearer` header takes precedence over the cookie.
fn raw_token<'r>(req: &'r Request<'_>) -> Option<String> {
    if let Some(header) = req.headers().get_one("Authorization") {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }
    req.cookies()
        .get(AUTH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Rights + Send,
{
    type Error = Error;

    /// Verify the request's token, check the user still exists, and check the
    /// user's role permits `R`.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwraps are safe as `Config` and `Db` are always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();
        let db = req.guard::<&State<Db>>().await.unwrap();

        let token = match raw_token(req) {
            Some(token) => token,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("not logged in".to_string()),
                ))
            }
        };

        let claims = match Claims::decode(&token, config) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected token: {e}");
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("invalid or expired token".to_string()),
                ));
            }
        };

        // The role is re-read from the database so demoted or deleted users lose access.
        let voter = match db.find_voter(*claims.id).await {
            Ok(Some(voter)) => voter,
            Ok(None) => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("user no longer exists".to_string()),
                ))
            }
            Err(e) => return Outcome::Failure((Status::InternalServerError, e)),
        };

        if !R::permits(voter.role) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("{} rights required", R::NAME)),
            ));
        }

        Outcome::Success(AuthToken {
            id: voter.id,
            role: voter.role,
            phantom: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_round_trip() {
        let config = Config::example();
        let voter = Voter {
            id: Id::new(),
            voter: crate::model::db::voter::VoterCore::example(),
        };
        let token = encode_token(&voter, &config).unwrap();
        let claims = Claims::decode(&token, &config).unwrap();
        assert_eq!(*claims.id, voter.id);
        assert_eq!(claims.role, Role::Voter);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = Config::example();
        let voter = Voter {
            id: Id::new(),
            voter: crate::model::db::voter::VoterCore::example(),
        };
        let token = encode_token(&voter, &config).unwrap();
        let other = Config::example_with_secret("another secret");
        assert!(Claims::decode(&token, &other).is_err());
    }
}
