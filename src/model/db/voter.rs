use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::Id;

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Admin,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterCore {
    pub first_name: String,
    pub last_name: String,
    /// Unique, stored upper-case.
    pub company_id: String,
    /// Argon2 encoded hash; never leaves the server.
    pub password_hash: String,
    pub has_voted: bool,
    pub role: Role,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl VoterCore {
    /// Create a user who has not voted. Names and company ID are normalised to upper case.
    pub fn new(
        first_name: &str,
        last_name: &str,
        company_id: &str,
        password_hash: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            first_name: first_name.trim().to_uppercase(),
            last_name: last_name.trim().to_uppercase(),
            company_id: normalize_company_id(company_id),
            password_hash,
            has_voted: false,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> Result<bool> {
        Ok(argon2::verify_encoded(&self.password_hash, password.as_ref())?)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &argon2::Config::default(),
    )?)
}

/// Company IDs are compared case-insensitively by storing them upper-case.
pub fn normalize_company_id(company_id: &str) -> String {
    company_id.trim().to_uppercase()
}

/// A user without an ID.
pub type NewVoter = VoterCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "password123";

    fn example_hash() -> String {
        hash_password(EXAMPLE_PASSWORD).unwrap()
    }

    impl VoterCore {
        pub fn example() -> Self {
            Self::new(
                "ada",
                "lovelace",
                "emp-001",
                example_hash(),
                Role::Voter,
            )
        }

        pub fn example2() -> Self {
            Self::new(
                "alan",
                "turing",
                "emp-002",
                example_hash(),
                Role::Voter,
            )
        }

        pub fn example_admin() -> Self {
            Self::new(
                "grace",
                "hopper",
                "adm-001",
                example_hash(),
                Role::Admin,
            )
        }
    }
}
