//! Cookie-session authentication transport.
//!
//! Mimics the behaviour of Jira's log-in page: a one-time POST of the
//! credentials to the session endpoint yields cookies that prove the client
//! is authenticated on every subsequent call.
//!
//! Jira API docs: https://docs.atlassian.com/jira/REST/latest/#auth/1/session

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, COOKIE, SET_COOKIE};
use reqwest::{Request, Response};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AuthTransport, IdentityTransport};
use crate::error::{Error, Result};
use crate::request::clone_request;

/// Timeout for the login exchange, independent of per-request deadlines.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// A cookie captured from the login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// The cookie name.
    pub name: String,
    /// The cookie value. Cookies with an empty value are never sent.
    pub value: String,
    /// Raw attributes (`Path=/`, `HttpOnly`, ...) as they appeared.
    pub attributes: Vec<String>,
}

impl SessionCookie {
    /// Parse a `Set-Cookie` header value.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            attributes: parts.map(|a| a.trim().to_string()).collect(),
        })
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// A transport that authenticates requests with Jira session cookies.
///
/// The first request triggers a login exchange against the configured auth
/// URL; the resulting cookies are cached and attached to every request for
/// the lifetime of the transport. A failed exchange is surfaced as
/// [`Error::Authentication`] and is not retried automatically; call
/// [`reset_session`](Self::reset_session) to force a new login.
pub struct CookieAuthTransport {
    username: String,
    password: String,
    auth_url: String,
    session: Mutex<Option<Vec<SessionCookie>>>,
    inner: Arc<dyn AuthTransport>,
}

impl CookieAuthTransport {
    /// Create a cookie-auth transport delegating to an identity transport.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            auth_url: auth_url.into(),
            session: Mutex::new(None),
            inner: Arc::new(IdentityTransport::default()),
        }
    }

    /// Replace the underlying transport requests are delegated to.
    pub fn with_transport(mut self, inner: Arc<dyn AuthTransport>) -> Self {
        self.inner = inner;
        self
    }

    /// Drop the cached session cookies so the next request logs in again.
    pub async fn reset_session(&self) {
        *self.session.lock().await = None;
    }

    /// Return the cached cookies, logging in first if none are cached.
    ///
    /// The lock is held across the exchange so concurrent first requests
    /// trigger exactly one login.
    async fn session_cookies(&self) -> Result<Vec<SessionCookie>> {
        let mut session = self.session.lock().await;
        if let Some(cookies) = session.as_ref() {
            return Ok(cookies.clone());
        }

        let cookies = self.acquire_session().await?;
        *session = Some(cookies.clone());
        Ok(cookies)
    }

    /// Perform the login exchange and capture the response cookies.
    async fn acquire_session(&self) -> Result<Vec<SessionCookie>> {
        info!(auth_url = %self.auth_url, "Acquiring session cookies");

        let client = reqwest::Client::builder()
            .timeout(LOGIN_TIMEOUT)
            .build()
            .map_err(|e| Error::Authentication(format!("failed to build auth client: {}", e)))?;

        let response = client
            .post(&self.auth_url)
            .json(&LoginBody {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("failed to authenticate: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Authentication(format!(
                "login exchange returned status {}",
                status
            )));
        }

        let cookies: Vec<SessionCookie> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(SessionCookie::parse)
            .collect();

        if cookies.is_empty() {
            return Err(Error::Authentication(
                "login exchange returned no cookies".to_string(),
            ));
        }

        debug!(count = cookies.len(), "Session cookies acquired");
        Ok(cookies)
    }
}

#[async_trait]
impl AuthTransport for CookieAuthTransport {
    async fn execute(&self, request: &Request) -> Result<Response> {
        let cookies = self.session_cookies().await?;

        let mut request = clone_request(request)?;
        if let Some(header) = cookie_header(&cookies)? {
            append_cookie_header(&mut request, header)?;
        }

        self.inner.execute(&request).await
    }
}

impl std::fmt::Debug for CookieAuthTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieAuthTransport")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .finish()
    }
}

/// Join cookies with a non-empty value into a single `Cookie` header value.
///
/// Returns `None` when every cookie has an empty value.
pub(crate) fn cookie_header(cookies: &[SessionCookie]) -> Result<Option<HeaderValue>> {
    let joined = cookies
        .iter()
        .filter(|c| !c.value.is_empty())
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ");

    if joined.is_empty() {
        return Ok(None);
    }

    let header = HeaderValue::from_str(&joined)
        .map_err(|e| Error::Authentication(format!("invalid cookie value: {}", e)))?;
    Ok(Some(header))
}

/// Set a `Cookie` header, merging with any cookies the caller already set.
pub(crate) fn append_cookie_header(request: &mut Request, header: HeaderValue) -> Result<()> {
    let merged = match request.headers().get(COOKIE) {
        Some(existing) => {
            let existing = existing
                .to_str()
                .map_err(|e| Error::Authentication(format!("invalid cookie value: {}", e)))?;
            let added = header
                .to_str()
                .map_err(|e| Error::Authentication(format!("invalid cookie value: {}", e)))?;
            HeaderValue::from_str(&format!("{}; {}", existing, added))
                .map_err(|e| Error::Authentication(format!("invalid cookie value: {}", e)))?
        }
        None => header,
    };

    request.headers_mut().insert(COOKIE, merged);
    Ok(())
}
