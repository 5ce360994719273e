use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::kv::StoreError;
use crate::models::Role;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Invalid input provided")]
    InvalidInput,
    #[error("Resource not found")]
    NotFound,
    #[error("Operation not authorized")]
    Unauthorized,
    #[error("Operation forbidden")]
    Forbidden,
    #[error("Resource conflict")]
    Conflict,
    #[error("Internal system error")]
    SystemError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),
    #[error("A ballot has already been cast for this DNI")]
    AlreadyVoted,
    #[error("Ballot is not complete")]
    BallotIncomplete,
    #[error("No {role} candidate with id {id}")]
    CandidateNotFound { role: Role, id: String },
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl ElectionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ElectionError::Validation(_) => ErrorCode::InvalidInput,
            ElectionError::InvalidCredentials => ErrorCode::Unauthorized,
            ElectionError::DuplicateEmail(_) => ErrorCode::Conflict,
            ElectionError::AlreadyVoted | ElectionError::BallotIncomplete => ErrorCode::Forbidden,
            ElectionError::CandidateNotFound { .. } => ErrorCode::NotFound,
            ElectionError::Storage(_) => ErrorCode::SystemError,
        }
    }
}

impl From<&ElectionError> for ErrorResponse {
    fn from(err: &ElectionError) -> Self {
        Self { error: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, ElectionError>;
