//! Error types for the JIRA client.

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when building, sending, or decoding a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The base URL or a relative URL could not be parsed.
    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The request body could not be JSON-encoded.
    #[error("failed to encode json body: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Transport-level failure (connection refused, timeout, TLS, ...).
    #[error("error making http request: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body stream could not be fully read.
    #[error("failed to read body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// The response body is not valid JSON.
    #[error("failed to parse body: {0}")]
    Parse(#[source] serde_json::Error),

    /// Authentication failed: the login exchange did not succeed, yielded no
    /// usable cookies, or credentials could not be encoded.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The request token could not be signed.
    #[error("jwt auth: error signing token: {0}")]
    Signing(String),

    /// The request could not be cloned for the transport chain.
    #[error("cannot clone request: {0}")]
    RequestClone(String),

    /// The server answered with a status outside [200, 299].
    #[error("{0}")]
    Api(ApiResponseError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error response from the JIRA API.
///
/// Carries the status code and the raw body, plus the parsed JSON value when
/// the body was valid JSON. The body is always preserved for inspection, even
/// when it did not parse.
#[derive(Debug)]
pub struct ApiResponseError {
    status: StatusCode,
    body: Bytes,
    value: Option<serde_json::Value>,
}

impl ApiResponseError {
    pub(crate) fn new(status: StatusCode, body: Bytes, value: Option<serde_json::Value>) -> Self {
        Self {
            status,
            body,
            value,
        }
    }

    /// The HTTP status code of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The raw response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The response body as text, lossily decoded.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The parsed JSON body, if the body was valid JSON.
    pub fn value(&self) -> Option<&serde_json::Value> {
        self.value.as_ref()
    }

    /// Extract human-readable messages from a JIRA error body.
    ///
    /// JIRA reports errors as `{"errorMessages": [...], "errors": {...}}`;
    /// both shapes are flattened into a single list. Empty when the body is
    /// not JSON or carries neither field.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        let Some(value) = &self.value else {
            return messages;
        };

        if let Some(arr) = value.get("errorMessages").and_then(|m| m.as_array()) {
            messages.extend(arr.iter().filter_map(|v| v.as_str()).map(String::from));
        }
        if let Some(obj) = value.get("errors").and_then(|e| e.as_object()) {
            messages.extend(obj.iter().map(|(k, v)| match v.as_str() {
                Some(s) => format!("{}: {}", k, s),
                None => format!("{}: {}", k, v),
            }));
        }

        messages
    }
}

impl std::fmt::Display for ApiResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages = self.messages();
        if messages.is_empty() {
            write!(f, "request failed with status {}", self.status)
        } else {
            write!(
                f,
                "request failed with status {}: {}",
                self.status,
                messages.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, body: &str) -> ApiResponseError {
        let value = serde_json::from_str(body).ok();
        ApiResponseError::new(
            StatusCode::from_u16(status).unwrap(),
            Bytes::copy_from_slice(body.as_bytes()),
            value,
        )
    }

    #[test]
    fn test_messages_from_error_messages_array() {
        let err = api_error(404, r#"{"errorMessages":["Issue does not exist"],"errors":{}}"#);
        assert_eq!(err.messages(), vec!["Issue does not exist"]);
    }

    #[test]
    fn test_messages_from_errors_object() {
        let err = api_error(400, r#"{"errorMessages":[],"errors":{"summary":"is required"}}"#);
        assert_eq!(err.messages(), vec!["summary: is required"]);
    }

    #[test]
    fn test_messages_empty_for_non_json_body() {
        let err = api_error(500, "Internal Server Error");
        assert!(err.value().is_none());
        assert!(err.messages().is_empty());
        assert_eq!(err.body_text(), "Internal Server Error");
    }

    #[test]
    fn test_display_includes_status_and_messages() {
        let err = api_error(404, r#"{"errorMessages":["Issue does not exist"]}"#);
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("Issue does not exist"));
    }

    #[test]
    fn test_display_without_messages_still_names_status() {
        let err = api_error(503, "unavailable");
        assert!(err.to_string().contains("503"));
    }
}
