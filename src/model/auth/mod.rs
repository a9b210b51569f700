mod rights;
mod token;

pub use rights::{Admin, Rights, User};
pub use token::{encode_token, token_cookie, AuthToken, AUTH_TOKEN_COOKIE};
