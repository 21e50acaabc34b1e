//! Pluggable authentication transports.
//!
//! A transport takes a fully-formed outbound request and returns a response,
//! optionally wrapping another transport. Each authenticating transport
//! clones the request before touching it (see
//! [`clone_request`](crate::request::clone_request)), so a request handed to
//! a transport chain is never mutated.
//!
//! Available strategies:
//! - [`IdentityTransport`]: no authentication, plain dispatch.
//! - [`BasicAuthTransport`]: HTTP Basic credentials on every request.
//! - [`CookieAuthTransport`]: one-time session login, cached cookies.
//! - [`JwtAuthTransport`]: a fresh signed token minted per request.

pub(crate) mod basic;
pub(crate) mod cookie;
mod jwt;
pub mod signer;

use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::error::Result;
use crate::request::clone_request;

pub use basic::BasicAuthTransport;
pub use cookie::{CookieAuthTransport, SessionCookie};
pub use jwt::JwtAuthTransport;

/// A transport that executes an outbound request.
///
/// Implementations must not mutate the request they are given; they clone it,
/// adjust the clone, and delegate. This keeps the caller's request intact
/// when transports are chained.
#[async_trait]
pub trait AuthTransport: Send + Sync + std::fmt::Debug {
    /// Execute the request and return the response.
    async fn execute(&self, request: &Request) -> Result<Response>;
}

/// A transport that dispatches requests as-is, without authentication.
///
/// This is the construction-time default for [`Client`](crate::Client) and
/// the innermost layer of every authenticating transport unless another is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct IdentityTransport {
    client: reqwest::Client,
}

impl IdentityTransport {
    /// Create an identity transport backed by the given HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthTransport for IdentityTransport {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let request = clone_request(request)?;
        Ok(self.client.execute(request).await?)
    }
}
