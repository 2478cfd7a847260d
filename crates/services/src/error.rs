use thiserror::Error;

use crate::dao::base::DaoError;
use crate::mail::MailError;

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("No invitations available")]
    QuotaExceeded,
    #[error("There can't be more accepted invitations than sent invitations")]
    AcceptanceExceedsSent,
    #[error("Invitation not found")]
    NotFound,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Registration requires an invitation")]
    RegistrationClosed,
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error(transparent)]
    Dao(DaoError),
}

impl From<DaoError> for InvitationError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => InvitationError::NotFound,
            other => InvitationError::Dao(other),
        }
    }
}

pub type InvitationResult<T> = Result<T, InvitationError>;
