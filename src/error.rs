use std::fmt::{Display, Formatter};

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::error;
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json, Request};
use serde::Serialize;
use thiserror::Error;

use crate::model::mongodb::Id;

pub type Result<T> = std::result::Result<T, Error>;

/// Which step of committing a ballot failed after the ballot itself was recorded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommitStage {
    /// Candidate vote counters were not incremented.
    Tally,
    /// The voter was not flagged as having voted.
    VoterFlag,
}

impl Display for CommitStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tally => write!(f, "tally increment"),
            Self::VoterFlag => write!(f, "voter flag"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    // Infrastructure failures. These are never described to the client.
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Internal error: {0}")]
    Internal(String),

    // Registry errors.
    #[error("{0} not found")]
    NotFound(String),
    #[error("A position named '{0}' already exists")]
    DuplicateName(String),
    #[error("Invalid selection rules: {0}")]
    InvalidRange(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Cannot delete position: {0} candidate(s) are assigned to it")]
    HasDependents(u64),
    #[error("Position {0} not found")]
    PositionNotFound(Id),

    // Casting errors.
    #[error("Voting is currently closed")]
    VotingClosed,
    #[error("Voter {0} not found")]
    VoterNotFound(Id),
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("No candidates selected")]
    EmptyBallot,
    #[error("Invalid or inactive position {0}")]
    InvalidPosition(Id),
    #[error("For position '{position}', you must select between {min} and {max} candidates; you selected {received}")]
    SelectionCountViolation {
        position: String,
        min: u32,
        max: u32,
        received: usize,
    },
    #[error("Invalid candidate {candidate} for position '{position}'")]
    InvalidCandidate { candidate: Id, position: String },
    #[error("Ballot {ballot} was recorded but the {stage} failed: {source}")]
    PartialCommit {
        ballot: Id,
        stage: CommitStage,
        #[source]
        source: Box<Error>,
    },

    // Account errors.
    #[error("Registration is currently closed")]
    RegistrationClosed,
    #[error("A user with company ID '{0}' already exists")]
    DuplicateCompanyId(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) | Self::Internal(_) => {
                Status::InternalServerError
            }
            Self::PartialCommit { .. } => Status::InternalServerError,
            Self::NotFound(_) | Self::PositionNotFound(_) | Self::VoterNotFound(_) => {
                Status::NotFound
            }
            Self::DuplicateName(_) | Self::DuplicateCompanyId(_) | Self::HasDependents(_) => {
                Status::Conflict
            }
            Self::InvalidRange(_)
            | Self::MissingField(_)
            | Self::EmptyBallot
            | Self::InvalidPosition(_)
            | Self::SelectionCountViolation { .. }
            | Self::InvalidCandidate { .. }
            | Self::BadRequest(_) => Status::BadRequest,
            Self::VotingClosed
            | Self::RegistrationClosed
            | Self::AlreadyVoted
            | Self::Forbidden(_) => Status::Forbidden,
            Self::Unauthorized(_) => Status::Unauthorized,
        }
    }

    /// Is this a failure of our own infrastructure rather than of the request?
    pub fn is_internal(&self) -> bool {
        self.status().code >= 500
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let message = match self {
            Self::PartialCommit { ballot, .. } => {
                error!("Unreconciled partial commit reported to client: {self}");
                format!("Your ballot {ballot} was recorded but could not be fully applied; an administrator must reconcile it")
            }
            ref err if err.is_internal() => {
                error!("Internal error handling {} {}: {err}", req.method(), req.uri());
                "Internal server error".to_string()
            }
            err => err.to_string(),
        };
        (status, Json(ErrorBody { message })).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        let errors = [
            Error::MissingField("name"),
            Error::EmptyBallot,
            Error::InvalidPosition(Id::new()),
            Error::SelectionCountViolation {
                position: "Treasurer".to_string(),
                min: 1,
                max: 2,
                received: 3,
            },
        ];
        for err in errors {
            assert_eq!(err.status(), Status::BadRequest);
            assert!(!err.is_internal());
        }
    }

    #[test]
    fn partial_commit_is_internal() {
        let err = Error::PartialCommit {
            ballot: Id::new(),
            stage: CommitStage::VoterFlag,
            source: Box::new(Error::Internal("connection reset".to_string())),
        };
        assert_eq!(err.status(), Status::InternalServerError);
        assert!(err.to_string().contains("voter flag"));
    }

    #[test]
    fn selection_count_message_names_range() {
        let err = Error::SelectionCountViolation {
            position: "Chair".to_string(),
            min: 1,
            max: 2,
            received: 3,
        };
        assert_eq!(
            err.to_string(),
            "For position 'Chair', you must select between 1 and 2 candidates; you selected 3"
        );
    }
}
