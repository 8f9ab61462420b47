//! Maps a completed attempt to success, retry or terminal failure.
//!
//! The upstream APIs report "resource already provisioned" either as a 409 or
//! as a plain 500 whose body names the condition. Both are treated as success
//! so re-running an idempotent configuration does not fail.

use crate::{Error, Response};

/// Body fragments that turn a 500 into an "already exists" success.
const ALREADY_EXISTS_MARKERS: [&str; 2] = ["already in use", "already exists"];

/// Classification of a status code and body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Success,
    Retryable,
    ClientError,
    Unexpected,
}

/// Result of one attempt.
#[derive(Debug)]
pub(crate) enum Outcome {
    Success(Response),
    Retryable(Error),
    Terminal(Error),
}

pub(crate) fn classify_status(status: u16, body: &[u8]) -> Verdict {
    match status {
        200..=299 | 409 => Verdict::Success,
        500 if reports_already_exists(body) => Verdict::Success,
        429 | 500.. => Verdict::Retryable,
        400..=499 => Verdict::ClientError,
        _ => Verdict::Unexpected,
    }
}

pub(crate) fn classify(response: Response) -> Outcome {
    match classify_status(response.status(), response.body()) {
        Verdict::Success => Outcome::Success(response),
        Verdict::Retryable => Outcome::Retryable(Error::Server { response }),
        Verdict::ClientError => Outcome::Terminal(Error::Client { response }),
        Verdict::Unexpected => Outcome::Terminal(Error::UnexpectedStatus { response }),
    }
}

/// Transport failures are always worth another attempt.
pub(crate) fn classify_transport_error(err: crate::BoxError) -> Outcome {
    Outcome::Retryable(Error::Transport(err))
}

fn reports_already_exists(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    ALREADY_EXISTS_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
}
