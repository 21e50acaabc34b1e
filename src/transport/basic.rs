//! HTTP Basic authentication transport.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};

use super::{AuthTransport, IdentityTransport};
use crate::error::{Error, Result};
use crate::request::clone_request;

/// A transport that authenticates every request with HTTP Basic credentials.
pub struct BasicAuthTransport {
    username: String,
    password: String,
    inner: Arc<dyn AuthTransport>,
}

impl BasicAuthTransport {
    /// Create a basic-auth transport delegating to an identity transport.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            inner: Arc::new(IdentityTransport::default()),
        }
    }

    /// Replace the underlying transport requests are delegated to.
    pub fn with_transport(mut self, inner: Arc<dyn AuthTransport>) -> Self {
        self.inner = inner;
        self
    }
}

#[async_trait]
impl AuthTransport for BasicAuthTransport {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let mut request = clone_request(request)?;
        let header = build_basic_header(&self.username, &self.password)?;
        request.headers_mut().insert(AUTHORIZATION, header);
        self.inner.execute(&request).await
    }
}

impl std::fmt::Debug for BasicAuthTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthTransport")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Build the `Basic base64(username:password)` header value.
pub(crate) fn build_basic_header(username: &str, password: &str) -> Result<HeaderValue> {
    let encoded = BASE64.encode(format!("{}:{}", username, password).as_bytes());
    let mut header = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|e| Error::Authentication(format!("invalid basic credentials: {}", e)))?;
    header.set_sensitive(true);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_round_trips() {
        let header = build_basic_header("user@example.com", "api_token_here").unwrap();
        let value = header.to_str().unwrap();
        let encoded = value.strip_prefix("Basic ").unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        assert_eq!(decoded, b"user@example.com:api_token_here");
    }

    #[test]
    fn test_debug_does_not_expose_password() {
        let transport = BasicAuthTransport::new("user", "secret_password");
        let debug = format!("{:?}", transport);
        assert!(!debug.contains("secret_password"));
    }
}
