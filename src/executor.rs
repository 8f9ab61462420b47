//! The attempt loop: send, classify, wait, repeat.

use std::borrow::Cow;

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE},
    Method,
};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Dispatch;

use crate::{
    classify::{classify, classify_transport_error, Outcome},
    request::{join_url, merge_headers, Payload},
    ClientConfig, Error, Request, Response, Result, Transport, TransportRequest,
};

/// What the loop does after an attempt.
#[derive(Debug)]
pub(crate) enum Step {
    Done(Result<Response>),
    Retry(Error),
}

/// Decides whether attempt number `attempt` (0-based) ends the call.
pub(crate) fn next_step(outcome: Outcome, attempt: usize, max_retries: usize) -> Step {
    match outcome {
        Outcome::Success(response) => Step::Done(Ok(response)),
        Outcome::Terminal(err) => Step::Done(Err(err)),
        Outcome::Retryable(err) if attempt < max_retries => Step::Retry(err),
        Outcome::Retryable(err) => Step::Done(Err(Error::RetriesExhausted {
            attempts: attempt + 1,
            last: Box::new(err),
        })),
    }
}

pub(crate) struct Executor<'a, T> {
    pub(crate) transport: &'a T,
    pub(crate) config: &'a ClientConfig,
    pub(crate) logger: Option<&'a Dispatch>,
}

impl<T: Transport> Executor<'_, T> {
    /// Runs one logical call to completion.
    pub(crate) async fn run(&self, request: Request) -> Result<Response> {
        let Request {
            method,
            path,
            headers,
            payload,
            encode_error,
            cancel,
            deadline,
        } = request;

        if let Some(err) = encode_error {
            return Err(Error::Serialization(err));
        }

        let url = join_url(&self.config.base_url, &path);
        let headers = merge_headers(&self.config.default_headers, &headers);
        let policy = self.config.retry;
        let started = Instant::now();
        let mut attempt = 0usize;

        loop {
            self.log(|| tracing::debug!(%method, %url, attempt = attempt + 1, "sending request"));

            let outgoing = self.build_attempt(&method, &url, &headers, payload.as_ref());
            let outcome = match self.transport.send(outgoing).await {
                Ok(received) => classify(Response::new(
                    received.status,
                    received.headers,
                    received.body,
                    started.elapsed(),
                )),
                Err(err) => classify_transport_error(err),
            };

            match next_step(outcome, attempt, policy.max_retries) {
                Step::Done(Ok(response)) => {
                    if attempt > 0 {
                        self.log(|| {
                            tracing::debug!(
                                %method,
                                %url,
                                attempts = attempt + 1,
                                status = response.status(),
                                "request succeeded after retries"
                            )
                        });
                    }
                    return Ok(response);
                }
                Step::Done(Err(err)) => {
                    self.log(|| tracing::warn!(%method, %url, error = %err, "request failed"));
                    return Err(err);
                }
                Step::Retry(err) => {
                    attempt += 1;
                    let delay = policy.delay(u32::try_from(attempt).unwrap_or(u32::MAX));
                    self.log(|| {
                        tracing::warn!(
                            %method,
                            %url,
                            attempt,
                            max_retries = policy.max_retries,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %err,
                            "retrying request"
                        )
                    });
                    wait_before_retry(delay, cancel.as_ref(), deadline).await?;
                }
            }
        }
    }

    /// Fresh request for one attempt. The body is a new view of the captured
    /// bytes, never a consumed stream.
    fn build_attempt(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        payload: Option<&Payload>,
    ) -> TransportRequest {
        let mut headers = headers.clone();
        let body = payload.map(|payload| {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(payload.content_type));
            headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.bytes.len()));
            payload.bytes.clone()
        });
        TransportRequest {
            method: method.clone(),
            url: url.to_owned(),
            headers,
            body,
            timeout: self.config.timeout,
        }
    }

    fn log(&self, emit: impl FnOnce()) {
        match self.logger {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, emit),
            None => emit(),
        }
    }
}

/// Sleeps for `delay` unless `cancel` fires or `deadline` passes first.
async fn wait_before_retry(
    delay: std::time::Duration,
    cancel: Option<&CancellationToken>,
    deadline: Option<Instant>,
) -> Result<()> {
    tokio::select! {
        biased;
        () = cancelled(cancel) => Err(Error::Cancelled(Cow::Borrowed(
            "cancellation requested while waiting to retry",
        ))),
        () = deadline_reached(deadline) => Err(Error::Cancelled(Cow::Borrowed(
            "deadline reached while waiting to retry",
        ))),
        () = sleep(delay) => Ok(()),
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
