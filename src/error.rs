use std::borrow::Cow;

use crate::Response;

/// Boxed error produced by a [`Transport`](crate::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request body could not be encoded. Never retried.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Connection-level failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
    /// 5xx or 429 response that did not match the "already exists" heuristic.
    #[error("server error {}: {}", .response.status(), .response.text())]
    Server { response: Response },
    /// 4xx response other than 409 and 429.
    #[error("client error {}: {}", .response.status(), .response.text())]
    Client { response: Response },
    /// Status outside every known class (1xx, unfollowed 3xx).
    #[error("unexpected status {}", .response.status())]
    UnexpectedStatus { response: Response },
    /// Every attempt failed with a retryable cause.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Total number of attempts performed.
        attempts: usize,
        /// Cause of the final attempt's failure.
        #[source]
        last: Box<Error>,
    },
    /// Cancellation token or deadline fired while waiting to retry.
    #[error("cancelled: {0}")]
    Cancelled(Cow<'static, str>),
    /// Response body decoding error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Response received on the attempt that produced this error, if any.
    ///
    /// Looks through [`Error::RetriesExhausted`] so callers can inspect the
    /// last response even after every retry failed.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Server { response }
            | Error::Client { response }
            | Error::UnexpectedStatus { response } => Some(response),
            Error::RetriesExhausted { last, .. } => last.response(),
            _ => None,
        }
    }

    /// Status code of the attached response, if any.
    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }

    /// Whether another attempt could succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Server { .. })
    }

    /// Consumes the error and returns the attached response, if any.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Error::Server { response }
            | Error::Client { response }
            | Error::UnexpectedStatus { response } => Some(response),
            Error::RetriesExhausted { last, .. } => last.into_response(),
            _ => None,
        }
    }
}
