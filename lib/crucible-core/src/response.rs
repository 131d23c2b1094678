//! HTTP response handling.
//!
//! [`Response`] provides access to status, headers, and body, plus the
//! `error_for_status` convention used by the exception-translation
//! middleware to surface non-success statuses as errors.

use std::collections::HashMap;

use bytes::Bytes;

use crate::{Error, Result};

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HashMap<String, String>,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to response headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

impl Response<Bytes> {
    /// Return the response unchanged when the status is a success, or an
    /// [`Error::Http`] carrying the status and body otherwise.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let message = http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("unexpected status");
        Err(Error::http_with_body(self.status, message, self.body))
    }

    /// Response body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|err| Error::invalid_request(format!("response body is not UTF-8: {err}")))
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> Response<Bytes> {
        Response::new(status, HashMap::default(), Bytes::from(body.to_string()))
    }

    #[test]
    fn response_status_classes() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(response(404, "").is_client_error());
        assert!(response(503, "").is_server_error());
        assert!(!response(301, "").is_success());
    }

    #[test]
    fn error_for_status_passes_success_through() {
        let response = response(200, "ok").error_for_status().expect("success");
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().expect("utf-8"), "ok");
    }

    #[test]
    fn error_for_status_surfaces_failure() {
        let err = response(408, "slow down")
            .error_for_status()
            .expect_err("non-success");

        assert_eq!(err.status(), Some(408));
        assert_eq!(err.to_string(), "HTTP error 408: Request Timeout");
        assert_eq!(err.body().map(AsRef::as_ref), Some(&b"slow down"[..]));
    }

    #[test]
    fn response_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Pong {
            ok: bool,
        }

        let decoded: Pong = response(200, r#"{"ok":true}"#).json().expect("json");
        assert_eq!(decoded, Pong { ok: true });
    }

    #[test]
    fn response_headers() {
        let mut response = response(200, "");
        response
            .headers_mut()
            .insert("Content-Type".to_string(), "text/plain".to_string());

        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert_eq!(response.header("Missing"), None);
    }
}
