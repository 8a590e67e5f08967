use crate::model::TransactionId;
use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The result of a call against the spending service.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The ways a call against the spending service can fail. Every failure is surfaced to the caller
/// as-is after a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request was malformed, e.g. a draft with a zero amount or an empty description. Carries
    /// a message that can be shown next to the form that produced it.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The credential is missing, expired or was rejected.
    #[error("Not authorized, please sign in again")]
    Unauthorized,

    /// The transaction does not exist (or no longer exists) on the service.
    #[error("Transaction {0} was not found")]
    NotFound(TransactionId),

    /// The service could not be reached.
    #[error("Unable to reach the service: {0}")]
    Network(String),

    /// Anything else, e.g. a 500 or a response body that could not be decoded.
    #[error("Unexpected response from the service: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Returns true for failures that should send the user back to the login view.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Why a create or delete made through the transaction cache did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The change itself failed. Nothing was changed on the service or in the cache.
    #[error(transparent)]
    Rejected(ApiError),

    /// The service accepted the change, but listing the transactions afterwards failed. The cache
    /// still holds what it held before the change.
    #[error("The change was saved but your transactions could not be reloaded: {0}")]
    Resync(ApiError),
}

impl MutationError {
    /// The underlying service error, whichever step produced it.
    pub fn api_error(&self) -> &ApiError {
        match self {
            MutationError::Rejected(e) | MutationError::Resync(e) => e,
        }
    }
}

impl From<ApiError> for MutationError {
    fn from(e: ApiError) -> Self {
        MutationError::Rejected(e)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Unknown(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
