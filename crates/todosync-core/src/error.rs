//! Error taxonomy surfaced to callers.
//!
//! None of these are retried automatically and none are fatal: callers
//! show them as a notice and let the user repeat the action.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::CredentialError;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before contacting the server.
    #[error("{0}")]
    Validation(String),

    /// An authenticated call was attempted with no stored token.
    #[error("Not logged in")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] CredentialError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status of a server rejection
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api(e) => e.status_code(),
            _ => None,
        }
    }

    /// True when the server rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Api(ApiError::Network(_)))
    }
}
