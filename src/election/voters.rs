use log::{info, warn};
use rocket::{
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::error::{Error, Result};
use crate::model::{
    api::voter::{Credentials, PasswordChange, Registration, MIN_PASSWORD_LENGTH},
    db::voter::{hash_password, normalize_company_id, NewVoter, Role, Voter},
    mongodb::Id,
};
use crate::store::Db;

use super::{positions::non_blank, state::ElectionState};

const BAD_CREDENTIALS: &str = "Incorrect company ID or password";

fn check_password_length(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

/// User accounts: registration, sign-in and maintenance.
pub struct VoterDirectory {
    db: Db,
    state: ElectionState,
}

impl VoterDirectory {
    pub fn new(db: Db, state: ElectionState) -> Self {
        Self { db, state }
    }

    /// Register a new voter, if registration is open.
    pub async fn register(&self, registration: Registration) -> Result<Voter> {
        if !self.state.is_registration_open() {
            return Err(Error::RegistrationClosed);
        }
        let first_name = non_blank(registration.first_name).ok_or(Error::MissingField("firstName"))?;
        let last_name = non_blank(registration.last_name).ok_or(Error::MissingField("lastName"))?;
        let company_id = non_blank(registration.company_id).ok_or(Error::MissingField("companyId"))?;
        let password = registration
            .password
            .filter(|p| !p.is_empty())
            .ok_or(Error::MissingField("password"))?;
        check_password_length(&password)?;

        let voter = NewVoter::new(
            &first_name,
            &last_name,
            &company_id,
            hash_password(&password)?,
            Role::Voter,
        );
        let voter = self.db.insert_voter(&voter).await?;
        info!("Registered voter {} ({})", voter.company_id, voter.id);
        Ok(voter)
    }

    /// Check credentials, returning the matching user.
    pub async fn login(&self, credentials: Credentials) -> Result<Voter> {
        let company_id = non_blank(credentials.company_id).ok_or(Error::MissingField("companyId"))?;
        let password = credentials
            .password
            .filter(|p| !p.is_empty())
            .ok_or(Error::MissingField("password"))?;

        let voter = self
            .db
            .find_voter_by_company_id(&normalize_company_id(&company_id))
            .await?;
        if let Some(voter) = voter {
            if voter.verify_password(&password)? {
                return Ok(voter);
            }
        }
        warn!("Failed login for company ID {company_id}");
        Err(Error::Unauthorized(BAD_CREDENTIALS.to_string()))
    }

    pub async fn get(&self, id: Id) -> Result<Voter> {
        self.db
            .find_voter(id)
            .await?
            .ok_or(Error::VoterNotFound(id))
    }

    pub async fn change_password(&self, id: Id, change: PasswordChange) -> Result<()> {
        let voter = self.get(id).await?;
        if !voter.verify_password(&change.current_password)? {
            return Err(Error::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }
        check_password_length(&change.new_password)?;

        let hash = hash_password(&change.new_password)?;
        if !self.db.set_password_hash(id, hash).await? {
            return Err(Error::VoterNotFound(id));
        }
        info!("Password changed for {} ({id})", voter.company_id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Voter>> {
        self.db.list_voters().await
    }

    /// Remove every voter-role account. Admins are kept.
    pub async fn delete_voters(&self) -> Result<u64> {
        let deleted = self.db.delete_voters_with_role(Role::Voter).await?;
        warn!("Deleted {deleted} voter account(s)");
        Ok(deleted)
    }
}

/// Seed a default administrator if there is none.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(db: &Db, company_id: &str, password: &str) -> Result<()> {
    if db.count_admins().await? > 0 {
        return Ok(());
    }
    let admin = NewVoter::new(
        "Default",
        "Admin",
        company_id,
        hash_password(password)?,
        Role::Admin,
    );
    let admin = db.insert_voter(&admin).await?;
    warn!(
        "No admin found, created default admin {} ({})",
        admin.company_id, admin.id
    );
    Ok(())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterDirectory {
    type Error = ();

    /// Panics iff the [`Db`] or [`ElectionState`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Db>>().await.unwrap();
        let state = req.guard::<&State<ElectionState>>().await.unwrap();
        Outcome::Success(Self::new(db.inner().clone(), state.inner().clone()))
    }
}
