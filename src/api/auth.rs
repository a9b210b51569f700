use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    election::VoterDirectory,
    error::Result,
    model::{
        api::voter::{AuthResponse, Credentials, PasswordChange, Registration},
        auth::{encode_token, token_cookie, AuthToken, User, AUTH_TOKEN_COOKIE},
        db::voter::Voter,
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, login, change_password, logout]
}

/// Issue a token for the user, both in the body and as a cookie.
fn sign_in(voter: Voter, cookies: &CookieJar<'_>, config: &Config) -> Result<AuthResponse> {
    let token = encode_token(&voter, config)?;
    cookies.add(token_cookie(token.clone(), config));
    Ok(AuthResponse {
        token,
        user: voter.into(),
    })
}

#[post("/auth/register", data = "<registration>", format = "json")]
pub async fn register(
    registration: Json<Registration>,
    directory: VoterDirectory,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<(Status, Json<AuthResponse>)> {
    let voter = directory.register(registration.0).await?;
    Ok((Status::Created, Json(sign_in(voter, cookies, config)?)))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    credentials: Json<Credentials>,
    directory: VoterDirectory,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let voter = directory.login(credentials.0).await?;
    Ok(Json(sign_in(voter, cookies, config)?))
}

#[patch("/auth/change-password", data = "<change>", format = "json")]
pub async fn change_password(
    token: AuthToken<User>,
    change: Json<PasswordChange>,
    directory: VoterDirectory,
) -> Result<()> {
    directory.change_password(token.id, change.0).await
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
