//! The HTTP transport the executor drives, and its `reqwest` implementation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{header::HeaderMap, Method};
use tokio::sync::Semaphore;

use crate::{BoxError, ClientConfig, Error, Result};

/// A single outgoing attempt.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// A response whose body has been read in full.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends one attempt and reads the whole response.
///
/// Any `Err` is a connection-level failure and is retried by the executor
/// while attempts remain. Connection pooling belongs to the implementation.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = std::result::Result<TransportResponse, BoxError>> + Send;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    in_flight: Arc<Semaphore>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("available_permits", &self.in_flight.available_permits())
            .finish()
    }
}

impl ReqwestTransport {
    /// Builds the pool from `config`'s sizing and TLS settings.
    ///
    /// `max_conns_per_host` bounds concurrent in-flight attempts across every
    /// clone of this transport.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_conns)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|err| Error::Config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self {
            http,
            in_flight: Arc::new(Semaphore::new(config.max_conns_per_host)),
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = std::result::Result<TransportResponse, BoxError>> + Send {
        async move {
            let _permit = self.in_flight.acquire().await?;

            let mut builder = self
                .http
                .request(request.method, &request.url)
                .headers(request.headers)
                .timeout(request.timeout);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permits_follow_max_conns_per_host() {
        let config = ClientConfig::new("https://splunk.example:8089").with_pool(4, 2);
        let transport = ReqwestTransport::from_config(&config).expect("transport must build");
        assert_eq!(transport.in_flight.available_permits(), 2);

        let clone = transport.clone();
        assert!(Arc::ptr_eq(&transport.in_flight, &clone.in_flight));
    }

    #[test]
    fn insecure_config_builds() {
        let config = ClientConfig::new("https://splunk.example:8089").insecure();
        assert!(!config.verify_tls);
        ReqwestTransport::from_config(&config).expect("insecure transport must build");
    }
}
