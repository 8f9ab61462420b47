//! Fully buffered response returned by a completed attempt.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AsHeaderName, HeaderMap};
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Immutable response of a completed attempt.
///
/// Headers are case-insensitive and keep every value a header was sent with,
/// in the order received.
#[derive(Clone, Debug)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
}

impl Response {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes, elapsed: Duration) -> Self {
        Self {
            status,
            headers,
            body,
            elapsed,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name` when it is valid visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Every value of `name` in the order received.
    pub fn header_values<K: AsHeaderName>(&self, name: K) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Time from the start of the logical call (not the attempt) until the
    /// body was fully read.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            Error::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                self.text()
            ))
        })
    }

    /// Body as UTF-8 text. Invalid sequences are replaced with U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use reqwest::header::{HeaderValue, SET_COOKIE};
    use serde_json::json;

    use super::*;

    fn response(status: u16, body: &'static [u8]) -> Response {
        Response::new(
            status,
            HeaderMap::new(),
            Bytes::from_static(body),
            Duration::ZERO,
        )
    }

    #[test]
    fn status_class_helpers() {
        assert!(response(200, b"").is_success());
        assert!(response(299, b"").is_success());
        assert!(!response(300, b"").is_success());
        assert!(response(404, b"").is_client_error());
        assert!(!response(500, b"").is_client_error());
        assert!(response(500, b"").is_server_error());
        assert!(response(599, b"").is_server_error());
        assert!(!response(499, b"").is_server_error());
    }

    #[test]
    fn json_decodes_what_was_encoded() {
        let value = json!({
            "name": "main",
            "frozenTimePeriodInSecs": 86400,
            "tags": ["a", "b"],
            "nested": { "enabled": true, "ratio": 0.5, "missing": null }
        });
        let body = Bytes::from(serde_json::to_vec(&value).expect("json value must encode"));
        let response = Response::new(200, HeaderMap::new(), body, Duration::ZERO);

        let decoded: serde_json::Value = response.json().expect("body must decode");
        assert_eq!(decoded, value);

        let typed: BTreeMap<String, serde_json::Value> =
            response.json().expect("body must decode into a map");
        assert_eq!(typed["name"], json!("main"));
    }

    #[test]
    fn json_reports_decode_error_for_malformed_body() {
        let err = response(200, b"{not json")
            .json::<serde_json::Value>()
            .expect_err("malformed body must fail");
        match err {
            Error::Decode(message) => assert!(message.contains("{not json")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn text_of_empty_body_is_empty() {
        assert_eq!(response(204, b"").text(), "");
        assert_eq!(response(200, b"ok").text(), "ok");
    }

    #[test]
    fn header_values_keep_order() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        let response = Response::new(200, headers, Bytes::new(), Duration::ZERO);

        assert_eq!(response.header("set-cookie"), Some("a=1"));
        assert_eq!(response.header_values("Set-Cookie"), vec!["a=1", "b=2"]);
        assert!(response.header("x-missing").is_none());
    }
}
