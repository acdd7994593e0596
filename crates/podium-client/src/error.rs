//! Error types for the Podium client.

use std::time::Duration;

use thiserror::Error;

/// Result type for Podium client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the interaction backend.
///
/// Every lower-level failure (DNS, HTTP, JSON) is folded into one of
/// these variants before it reaches a widget; nothing panics past the
/// call site.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never reached the backend (DNS, connection refused).
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The request was sent but no response arrived within the bound.
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    /// The backend answered with a rejection, either a non-2xx status
    /// or a business-rule refusal such as a nickname already taken.
    #[error("remote rejected request ({status}): {message}")]
    RemoteRejected {
        /// HTTP status code of the response.
        status: u16,
        /// Response text, if any.
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The action was blocked client-side before any network call.
    #[error("local precondition failed: {0}")]
    LocalPreconditionFailed(String),

    /// A path could not be resolved into a request URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Reading or writing the persisted identity file failed.
    #[error("identity storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is transient and worth a manual retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_) | Error::TimedOut(_))
    }
}
