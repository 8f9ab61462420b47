//! `provision-http` is a resilient async HTTP client for configuring SaaS
//! resources (indexes, accounts, data inputs) over slow REST endpoints.
//!
//! Every call made through [`Client`]:
//! - captures its body once and replays it byte-for-byte on each attempt
//! - retries 5xx, 429 and connection failures with exponential backoff
//!   ([`RetryPolicy`])
//! - treats "already exists" answers (409, or a 500 whose body says
//!   "already exists" / "already in use") as success, so re-running an
//!   idempotent configuration does not fail
//! - returns the received [`Response`] alongside any error caused by one
//!   ([`Error::response`])

mod classify;
mod client;
mod error;
mod executor;
mod options;
mod request;
mod response;
mod retry;
mod transport;

pub use client::Client;
pub use error::{BoxError, Error};
pub use options::{
    ClientConfig, DEFAULT_MAX_CONNS_PER_HOST, DEFAULT_MAX_IDLE_CONNS, DEFAULT_TIMEOUT,
};
pub use request::{Request, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
pub use response::Response;
pub use retry::{RetryPolicy, DEFAULT_BACKOFF_EXPONENT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

pub use reqwest::{header, Method};
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, Error>;
