//! The JIRA API client core.
//!
//! Owns base URL resolution, request construction, dispatch through the
//! configured [`AuthTransport`], and response decoding/classification. The
//! client is safe for concurrent use: every call builds its own request, and
//! the only shared mutable state (the client-level auth mode and session) is
//! behind locks.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use reqwest::{Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{ApiResponseError, Error, Result};
use crate::models::Session;
use crate::request::RequestOption;
use crate::transport::basic::build_basic_header;
use crate::transport::cookie::{append_cookie_header, cookie_header};
use crate::transport::{AuthTransport, IdentityTransport, SessionCookie};

/// Path of the session login endpoint, relative to the base URL.
const SESSION_PATH: &str = "rest/auth/1/session";

/// The client-level authentication mode.
///
/// This is the simple auth path attached directly by the client when building
/// a request; it is independent of the pluggable [`AuthTransport`] chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// No client-level authentication.
    #[default]
    None,
    /// HTTP Basic credentials on every built request.
    Basic,
    /// Session cookies from an earlier login exchange.
    Session,
}

#[derive(Debug, Default)]
struct ClientAuth {
    auth_type: AuthType,
    username: String,
    password: String,
}

/// The JIRA API client.
#[derive(Debug)]
pub struct Client {
    base_url: Url,
    transport: Arc<dyn AuthTransport>,
    auth: RwLock<ClientAuth>,
    session: RwLock<Option<Session>>,
}

/// Builder for [`Client`].
///
/// Defaults are resolved at construction time: a fresh `reqwest::Client` and
/// an [`IdentityTransport`] unless others are supplied.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    http: Option<reqwest::Client>,
    transport: Option<Arc<dyn AuthTransport>>,
}

impl ClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: None,
            transport: None,
        }
    }

    /// Use the given HTTP client for the default transport.
    pub fn http(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Use the given authentication transport instead of the identity default.
    pub fn transport(mut self, transport: Arc<dyn AuthTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UrlParse`] if the base URL is malformed, or
    /// [`Error::Network`] if the default HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        // Ensure the base URL ends with a slash so relative paths resolve
        // under it rather than replacing its last segment.
        let mut base_url = self.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let http = match self.http {
                    Some(http) => http,
                    None => reqwest::Client::builder().build()?,
                };
                Arc::new(IdentityTransport::new(http)) as Arc<dyn AuthTransport>
            }
        };

        info!(base_url = %base_url, "JIRA client created");
        Ok(Client {
            base_url,
            transport,
            auth: RwLock::new(ClientAuth::default()),
            session: RwLock::new(None),
        })
    }
}

impl Client {
    /// Create a client with the identity transport and no authentication.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    /// Start building a client for the given base URL.
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// The normalized base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The active client-level authentication mode.
    pub fn auth_type(&self) -> AuthType {
        self.auth.read().unwrap().auth_type
    }

    /// Attach HTTP Basic credentials to every request built by this client.
    pub fn set_basic_auth(&self, username: impl Into<String>, password: impl Into<String>) {
        let mut auth = self.auth.write().unwrap();
        auth.auth_type = AuthType::Basic;
        auth.username = username.into();
        auth.password = password.into();
    }

    /// Build a request with a JSON-encoded body.
    ///
    /// The path is resolved relative to the base URL (a leading `/` is
    /// stripped first), `Content-Type: application/json` is set when unset,
    /// the client-level auth mode is applied, and `options` run in order with
    /// the first failure short-circuiting.
    pub fn new_request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
        options: &[RequestOption],
    ) -> Result<Request> {
        let body = match body {
            Some(value) => Some(serde_json::to_vec(value).map_err(Error::Encoding)?),
            None => None,
        };
        self.new_raw_request(method, path, body, options)
    }

    /// Build a request from raw body bytes. See [`new_request`](Self::new_request).
    pub fn new_raw_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        options: &[RequestOption],
    ) -> Result<Request> {
        // The base URL carries the trailing slash, so strip the leading one
        // here; "/rest/api/2/issue" and "rest/api/2/issue" are equivalent.
        let url = self.base_url.join(path.trim_start_matches('/'))?;

        let mut request = Request::new(method, url);
        if let Some(bytes) = body {
            *request.body_mut() = Some(bytes.into());
        }
        if !request.headers().contains_key(CONTENT_TYPE) {
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        self.apply_client_auth(&mut request)?;

        for option in options {
            option(&mut request)?;
        }

        Ok(request)
    }

    /// Attach the client-level auth mode, if one is configured.
    fn apply_client_auth(&self, request: &mut Request) -> Result<()> {
        let auth = self.auth.read().unwrap();
        match auth.auth_type {
            AuthType::None => {}
            AuthType::Basic => {
                if !auth.username.is_empty() {
                    let header = build_basic_header(&auth.username, &auth.password)?;
                    request.headers_mut().insert(AUTHORIZATION, header);
                }
            }
            AuthType::Session => {
                let session = self.session.read().unwrap();
                if let Some(session) = session.as_ref() {
                    if let Some(header) = cookie_header(&session.cookies)? {
                        append_cookie_header(request, header)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Send a request and decode the response.
    ///
    /// The whole body is buffered so it stays readable from the returned
    /// [`ApiResponse`] (or from the [`Error::Api`] payload) any number of
    /// times. A status outside [200, 299] always yields [`Error::Api`]
    /// carrying the status and body, whether or not the body was JSON; a
    /// 2xx response with an unparseable non-empty body yields
    /// [`Error::Parse`].
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn send(&self, request: Request) -> Result<ApiResponse> {
        debug!("Dispatching request");

        let response = self.transport.execute(&request).await?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await.map_err(Error::BodyRead)?;

        let parsed: std::result::Result<Option<serde_json::Value>, serde_json::Error> =
            if body.is_empty() {
                Ok(None)
            } else {
                serde_json::from_slice(&body).map(Some)
            };

        if !status.is_success() {
            debug!(status = %status, "Request failed");
            let value = parsed.ok().flatten();
            return Err(Error::Api(ApiResponseError::new(status, body, value)));
        }

        let value = parsed.map_err(Error::Parse)?;
        debug!(status = %status, "Request succeeded");
        Ok(ApiResponse {
            status,
            headers,
            url,
            body,
            value,
        })
    }

    /// Log in against `rest/auth/1/session` and keep the returned cookies.
    ///
    /// On success the client switches to [`AuthType::Session`] and attaches
    /// the cookies to every subsequent request. The session is not refreshed
    /// automatically; a later 401 surfaces as [`Error::Api`] and the caller
    /// decides whether to log in again.
    #[instrument(skip(self, password))]
    pub async fn acquire_session_cookie(&self, username: &str, password: &str) -> Result<Session> {
        info!("Acquiring session cookie");

        let body = serde_json::json!({ "username": username, "password": password });
        let request = self.new_request(Method::POST, SESSION_PATH, Some(&body), &[])?;

        let response = self
            .send(request)
            .await
            .map_err(|e| Error::Authentication(format!("session login failed: {}", e)))?;

        let mut session: Session = response
            .json()
            .map_err(|e| Error::Authentication(format!("invalid session response: {}", e)))?;
        session.cookies = response.session_cookies();
        if session.cookies.is_empty() {
            return Err(Error::Authentication(
                "login response carried no cookies".to_string(),
            ));
        }

        *self.session.write().unwrap() = Some(session.clone());
        {
            let mut auth = self.auth.write().unwrap();
            auth.auth_type = AuthType::Session;
            auth.username = username.to_string();
            auth.password = password.to_string();
        }

        info!("Session established");
        Ok(session)
    }

    /// End the current session and clear the cached cookies.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if self.auth_type() != AuthType::Session {
            return Err(Error::Authentication(
                "no session to log out from".to_string(),
            ));
        }

        let request = self.new_request::<()>(Method::DELETE, SESSION_PATH, None, &[])?;
        self.send(request).await?;

        *self.session.write().unwrap() = None;
        let mut auth = self.auth.write().unwrap();
        auth.auth_type = AuthType::None;
        auth.username.clear();
        auth.password.clear();

        info!("Session ended");
        Ok(())
    }
}

/// A decoded API response.
///
/// The body is fully buffered; [`body`](Self::body) and [`json`](Self::json)
/// can be called any number of times.
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: Bytes,
    value: Option<serde_json::Value>,
}

impl ApiResponse {
    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The final URL of the request.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The raw response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The parsed JSON body. `None` when the body was empty.
    pub fn value(&self) -> Option<&serde_json::Value> {
        self.value.as_ref()
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::Parse)
    }

    /// Cookies set by the response, parsed from its `Set-Cookie` headers.
    pub fn session_cookies(&self) -> Vec<SessionCookie> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(SessionCookie::parse)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new("https://jira.example.com").unwrap()
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let client = Client::new("https://jira.example.com/jira").unwrap();
        assert_eq!(client.base_url().as_str(), "https://jira.example.com/jira/");
    }

    #[test]
    fn test_base_url_with_trailing_slash_kept() {
        let client = Client::new("https://jira.example.com/jira/").unwrap();
        assert_eq!(client.base_url().as_str(), "https://jira.example.com/jira/");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            Client::new("not a url"),
            Err(Error::UrlParse(_))
        ));
    }

    #[test]
    fn test_leading_slash_resolves_like_none() {
        let client = Client::new("https://jira.example.com/jira").unwrap();
        let with = client
            .new_request::<()>(Method::GET, "/rest/api/2/issue/X-1", None, &[])
            .unwrap();
        let without = client
            .new_request::<()>(Method::GET, "rest/api/2/issue/X-1", None, &[])
            .unwrap();
        assert_eq!(with.url(), without.url());
        assert_eq!(
            with.url().as_str(),
            "https://jira.example.com/jira/rest/api/2/issue/X-1"
        );
    }

    #[test]
    fn test_new_request_sets_json_content_type() {
        let request = client()
            .new_request::<()>(Method::GET, "rest/api/2/myself", None, &[])
            .unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_new_request_encodes_body() {
        let body = serde_json::json!({"fields": {"summary": "hello"}});
        let request = client()
            .new_request(Method::POST, "rest/api/2/issue", Some(&body), &[])
            .unwrap();
        let bytes = request.body().unwrap().as_bytes().unwrap();
        let round_trip: serde_json::Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(round_trip, body);
    }

    #[test]
    fn test_basic_client_auth_attaches_header() {
        let client = client();
        client.set_basic_auth("user", "pass");
        let request = client
            .new_request::<()>(Method::GET, "rest/api/2/myself", None, &[])
            .unwrap();
        let header = request.headers().get(AUTHORIZATION).unwrap();
        assert!(header.to_str().unwrap().starts_with("Basic "));
    }

    #[test]
    fn test_basic_client_auth_with_empty_username_is_skipped() {
        let client = client();
        client.set_basic_auth("", "pass");
        let request = client
            .new_request::<()>(Method::GET, "rest/api/2/myself", None, &[])
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_request_options_run_in_order() {
        let options: Vec<RequestOption> = vec![
            Box::new(|request: &mut Request| {
                request.headers_mut().insert(
                    reqwest::header::ACCEPT,
                    HeaderValue::from_static("application/json"),
                );
                Ok(())
            }),
            Box::new(|request: &mut Request| {
                request.headers_mut().insert(
                    reqwest::header::ACCEPT,
                    HeaderValue::from_static("application/xml"),
                );
                Ok(())
            }),
        ];
        let request = client()
            .new_request::<()>(Method::GET, "rest/api/2/myself", None, &options)
            .unwrap();
        assert_eq!(
            request.headers().get(reqwest::header::ACCEPT).unwrap(),
            "application/xml"
        );
    }

    #[test]
    fn test_failing_request_option_short_circuits() {
        let options: Vec<RequestOption> = vec![
            Box::new(|_: &mut Request| {
                Err(Error::Encoding(
                    serde_json::from_str::<serde_json::Value>("not json").unwrap_err(),
                ))
            }),
            Box::new(|request: &mut Request| {
                request
                    .headers_mut()
                    .insert(reqwest::header::ACCEPT, HeaderValue::from_static("never"));
                Ok(())
            }),
        ];
        let result = client().new_request::<()>(Method::GET, "rest/api/2/myself", None, &options);
        assert!(matches!(result, Err(Error::Encoding(_))));
    }
}
