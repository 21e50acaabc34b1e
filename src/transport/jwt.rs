//! Signed-token (JWT) authentication transport.
//!
//! This is the auth form used by add-ons installed from the Atlassian
//! marketplace. Every request gets a freshly minted HS256 token whose `qsh`
//! claim binds it to that request's method, path, and query; tokens are never
//! cached, so the replay window is the 59-second lifetime.
//!
//! Jira docs: https://developer.atlassian.com/cloud/jira/platform/understanding-jwt

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use serde::Serialize;
use sha2::Sha256;

use super::signer::query_string_hash;
use super::{AuthTransport, IdentityTransport};
use crate::error::{Error, Result};
use crate::request::clone_request;

/// Token lifetime. Kept just under a minute so clock drift between client
/// and server stays inside Atlassian's leeway.
const TOKEN_LIFETIME: Duration = Duration::from_secs(59);

const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    iat: u64,
    exp: u64,
    qsh: &'a str,
}

/// A transport that signs every request with a short-lived JWT.
pub struct JwtAuthTransport {
    secret: Vec<u8>,
    issuer: String,
    inner: Arc<dyn AuthTransport>,
}

impl JwtAuthTransport {
    /// Create a JWT transport delegating to an identity transport.
    pub fn new(secret: impl Into<Vec<u8>>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            inner: Arc::new(IdentityTransport::default()),
        }
    }

    /// Replace the underlying transport requests are delegated to.
    pub fn with_transport(mut self, inner: Arc<dyn AuthTransport>) -> Self {
        self.inner = inner;
        self
    }

    /// Mint a compact-serialized token bound to the given request hash.
    fn mint_token(&self, qsh: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::Signing("system clock is before the Unix epoch".to_string()))?
            .as_secs();

        let claims = serde_json::to_vec(&Claims {
            iss: &self.issuer,
            iat: now,
            exp: now + TOKEN_LIFETIME.as_secs(),
            qsh,
        })
        .map_err(|e| Error::Signing(format!("failed to encode claims: {}", e)))?;

        let mut token = format!(
            "{}.{}",
            BASE64_URL.encode(JWT_HEADER.as_bytes()),
            BASE64_URL.encode(&claims)
        );

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Signing(format!("unusable secret: {}", e)))?;
        mac.update(token.as_bytes());
        let signature = mac.finalize().into_bytes();

        token.push('.');
        token.push_str(&BASE64_URL.encode(signature));
        Ok(token)
    }
}

#[async_trait]
impl AuthTransport for JwtAuthTransport {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let mut request = clone_request(request)?;

        let qsh = query_string_hash(request.method(), request.url());
        let token = self.mint_token(&qsh)?;

        let mut header = HeaderValue::from_str(&format!("JWT {}", token))
            .map_err(|e| Error::Signing(format!("invalid token header: {}", e)))?;
        header.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, header);

        self.inner.execute(&request).await
    }
}

impl std::fmt::Debug for JwtAuthTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthTransport")
            .field("issuer", &self.issuer)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_segment(segment: &str) -> serde_json::Value {
        let bytes = BASE64_URL.decode(segment).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_token_has_three_segments() {
        let transport = JwtAuthTransport::new(b"shared-secret".to_vec(), "my-addon");
        let token = transport.mint_token("abc123").unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_token_header_declares_hs256() {
        let transport = JwtAuthTransport::new(b"shared-secret".to_vec(), "my-addon");
        let token = transport.mint_token("abc123").unwrap();
        let header = decode_segment(token.split('.').next().unwrap());
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_token_claims_carry_issuer_qsh_and_expiry() {
        let transport = JwtAuthTransport::new(b"shared-secret".to_vec(), "my-addon");
        let token = transport.mint_token("deadbeef").unwrap();
        let claims = decode_segment(token.split('.').nth(1).unwrap());

        assert_eq!(claims["iss"], "my-addon");
        assert_eq!(claims["qsh"], "deadbeef");
        let iat = claims["iat"].as_u64().unwrap();
        let exp = claims["exp"].as_u64().unwrap();
        assert_eq!(exp - iat, 59);
    }

    #[test]
    fn test_token_signature_verifies_with_shared_secret() {
        let transport = JwtAuthTransport::new(b"shared-secret".to_vec(), "my-addon");
        let token = transport.mint_token("abc").unwrap();

        let (signing_input, signature) = token.rsplit_once('.').unwrap();
        let mut mac = HmacSha256::new_from_slice(b"shared-secret").unwrap();
        mac.update(signing_input.as_bytes());
        let expected = BASE64_URL.encode(mac.finalize().into_bytes());
        assert_eq!(signature, expected);
    }

    #[test]
    fn test_tokens_are_minted_fresh_per_call() {
        let transport = JwtAuthTransport::new(b"shared-secret".to_vec(), "my-addon");
        let first = transport.mint_token("abc").unwrap();
        let second = transport.mint_token("def").unwrap();
        // Different qsh values must yield different claim segments.
        assert_ne!(
            first.split('.').nth(1).unwrap(),
            second.split('.').nth(1).unwrap()
        );
    }
}
