use std::fmt;

use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::Dispatch;

use crate::{
    executor::Executor, ClientConfig, Request, ReqwestTransport, Response, Result, Transport,
};

#[derive(Clone)]
/// Resilient HTTP client for provisioning endpoints.
///
/// Every call retries transient failures (5xx, 429, connection errors) with
/// exponential backoff and treats "already exists" answers (409, or a 500
/// whose body says so) as success. The configuration is fixed at
/// construction; clones share the transport's connection pool.
pub struct Client<T = ReqwestTransport> {
    transport: T,
    config: ClientConfig,
    logger: Option<Dispatch>,
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

impl Client<ReqwestTransport> {
    /// Creates a client over a pooled `reqwest` transport.
    ///
    /// Zero-valued config fields are replaced with their defaults before the
    /// config is validated.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use provision_http::{Client, ClientConfig};
    ///
    /// let client = Client::new(ClientConfig::new("https://splunk.example:8089"))
    ///     .expect("valid config");
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config)?;
        Ok(Self {
            transport,
            config,
            logger: None,
        })
    }

    /// Creates a client from `PROVISION_HTTP_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;
        Ok(Self {
            transport,
            config,
            logger: None,
        })
    }

    /// Routes this client's diagnostics to `dispatch` instead of the ambient
    /// `tracing` subscriber.
    pub fn with_logger(mut self, dispatch: Dispatch) -> Self {
        self.logger = Some(dispatch);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get(&self, path: &str, headers: HeaderMap) -> Result<Response> {
        self.send(Request::get(path).headers(headers)).await
    }

    /// Sends `body` as JSON.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<Response> {
        self.send(Request::post(path).headers(headers).json(body))
            .await
    }

    /// Sends `fields` url-encoded, in iteration order.
    pub async fn post_form<I, K, V>(
        &self,
        path: &str,
        fields: I,
        headers: HeaderMap,
    ) -> Result<Response>
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.send(Request::post(path).headers(headers).form(fields))
            .await
    }

    /// Sends `body` as JSON.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<Response> {
        self.send(Request::put(path).headers(headers).json(body))
            .await
    }

    pub async fn delete(&self, path: &str, headers: HeaderMap) -> Result<Response> {
        self.send(Request::delete(path).headers(headers)).await
    }

    /// Executes `request`, retrying as configured.
    ///
    /// Errors caused by a received response carry it; see
    /// [`Error::response`](crate::Error::response).
    pub async fn send(&self, request: Request) -> Result<Response> {
        Executor {
            transport: &self.transport,
            config: &self.config,
            logger: self.logger.as_ref(),
        }
        .run(request)
        .await
    }
}
