//! Error types for the authority.

use thiserror::Error;

/// Result type for authority operations.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

/// Errors that can occur in the authority.
#[derive(Error, Debug)]
pub enum AuthorityError {
    /// No user has the requested id.
    #[error("user not found")]
    UserNotFound,

    /// The id in the path is not a user id.
    #[error("invalid user id: {0}")]
    InvalidId(String),

    /// The request body is not acceptable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error on the users file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The users file is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthorityError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthorityError::UserNotFound
                | AuthorityError::InvalidId(_)
                | AuthorityError::InvalidRequest(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the HTTP status code for this error.
    ///
    /// A malformed id can never name a user, so it answers 404 like an
    /// unknown one.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthorityError::UserNotFound | AuthorityError::InvalidId(_) => 404,
            AuthorityError::InvalidRequest(_) => 400,
            AuthorityError::Io(_) | AuthorityError::Json(_) | AuthorityError::Internal(_) => 500,
        }
    }

    /// Returns true if the error means "no such user".
    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}
