use bytes::Bytes;
use reqwest::{header::HeaderMap, Method};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Body captured once, before the first attempt, and replayed unchanged on
/// every retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Payload {
    pub(crate) content_type: &'static str,
    pub(crate) bytes: Bytes,
}

/// One logical call: method, path, optional body and per-call headers.
///
/// Built with [`Request::get`], [`Request::post`], [`Request::put`],
/// [`Request::delete`] or [`Request::new`] and executed by
/// [`Client::send`](crate::Client::send).
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) payload: Option<Payload>,
    pub(crate) encode_error: Option<serde_json::Error>,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) deadline: Option<Instant>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            payload: None,
            encode_error: None,
            cancel: None,
            deadline: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Per-call headers. Each key replaces every value the client's default
    /// headers hold for it.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Encodes `body` as JSON now.
    ///
    /// An encoding failure is reported when the request is sent, before any
    /// transport call.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.payload = Some(Payload {
                    content_type: CONTENT_TYPE_JSON,
                    bytes: Bytes::from(bytes),
                });
                self.encode_error = None;
            }
            Err(err) => {
                self.payload = None;
                self.encode_error = Some(err);
            }
        }
        self
    }

    /// Url-encodes `fields` as `key=value&...` in iteration order.
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.payload = Some(Payload {
            content_type: CONTENT_TYPE_FORM,
            bytes: Bytes::from(encoded),
        });
        self.encode_error = None;
        self
    }

    /// Aborts the call if `token` is cancelled while waiting between attempts.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Aborts the call if `deadline` passes while waiting between attempts.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Defaults first, then per-call overrides. Keys compare case-insensitively
/// and an override replaces all default values for its key.
pub(crate) fn merge_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    merged.extend(overrides.clone());
    merged
}

/// Joins `path` onto `base_url` with exactly one `/` between them. Absolute
/// `http(s)://` paths are used as-is.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    }
}
