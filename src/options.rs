use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::{Error, Result, RetryPolicy};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_IDLE_CONNS: usize = 100;
pub const DEFAULT_MAX_CONNS_PER_HOST: usize = 100;

/// Configures the target endpoint, default headers, timeout, retry behavior
/// and connection pool of a [`Client`](crate::Client).
///
/// Zero-valued durations, retry count, exponent and pool sizes are replaced
/// with their defaults when the client is built.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL every request path is joined to.
    pub base_url: String,
    /// Headers sent on every request unless a call overrides the same key.
    pub default_headers: HeaderMap,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Idle connections kept per host.
    pub max_idle_conns: usize,
    /// Concurrent in-flight requests per client.
    pub max_conns_per_host: usize,
    /// Verify the server's TLS certificate.
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            max_conns_per_host: DEFAULT_MAX_CONNS_PER_HOST,
            verify_tls: true,
        }
    }
}

// Header values commonly carry credentials, so only names are printed.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self
            .default_headers
            .keys()
            .map(|name| name.as_str())
            .collect();
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("default_headers", &header_names)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_conns_per_host", &self.max_conns_per_host)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pool(mut self, max_idle_conns: usize, max_conns_per_host: usize) -> Self {
        self.max_idle_conns = max_idle_conns;
        self.max_conns_per_host = max_conns_per_host;
        self
    }

    /// Disables TLS certificate verification. Only for self-signed test
    /// deployments.
    pub fn insecure(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Creates a config from environment variables.
    ///
    /// Reads:
    /// - `PROVISION_HTTP_BASE_URL` (required)
    /// - `PROVISION_HTTP_TIMEOUT_SECS`
    /// - `PROVISION_HTTP_MAX_RETRIES`
    /// - `PROVISION_HTTP_RETRY_DELAY_MS`
    /// - `PROVISION_HTTP_BACKOFF_EXPONENT`
    /// - `PROVISION_HTTP_INSECURE_TLS`: `true` or `1` disables verification
    ///
    /// Unset optional variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PROVISION_HTTP_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::Config("PROVISION_HTTP_BASE_URL is missing or empty".to_owned())
            })?;
        let mut config = Self::new(base_url.trim());

        if let Some(secs) = parse_var::<u64, _>(&lookup, "PROVISION_HTTP_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<usize, _>(&lookup, "PROVISION_HTTP_MAX_RETRIES")? {
            config.retry.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "PROVISION_HTTP_RETRY_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(exponent) =
            parse_var::<f64, _>(&lookup, "PROVISION_HTTP_BACKOFF_EXPONENT")?
        {
            config.retry.backoff_exponent = exponent;
        }
        if let Some(insecure) = lookup("PROVISION_HTTP_INSECURE_TLS") {
            config.verify_tls = !matches!(
                insecure.trim().to_ascii_lowercase().as_str(),
                "1" | "true"
            );
        }
        Ok(config)
    }

    /// Replaces zero-valued fields with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.max_idle_conns == 0 {
            self.max_idle_conns = DEFAULT_MAX_IDLE_CONNS;
        }
        if self.max_conns_per_host == 0 {
            self.max_conns_per_host = DEFAULT_MAX_CONNS_PER_HOST;
        }
        self.retry = self.retry.normalized();
        self
    }

    /// Checks a normalized config.
    pub fn validate(&self) -> Result<()> {
        let base_url = url::Url::parse(&self.base_url)
            .map_err(|err| Error::Config(format!("invalid base URL '{}': {err}", self.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base URL '{}' must use http or https",
                self.base_url
            )));
        }
        let exponent = self.retry.backoff_exponent;
        if !exponent.is_finite() || exponent < 0.0 {
            return Err(Error::Config(format!(
                "backoff exponent must be a finite non-negative number, got {exponent}"
            )));
        }
        if self.max_conns_per_host > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "max_conns_per_host must be at most {}",
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| Error::Config(format!("{key}={raw:?} is invalid: {err}"))),
    }
}
