//! A typed async client for the JIRA REST API.
//!
//! The crate is built around two pieces:
//!
//! - [`Client`]: resolves paths against a base URL, builds JSON requests,
//!   dispatches them, and classifies responses.
//! - [`transport`]: interchangeable authentication strategies (basic,
//!   cookie-session, signed-token) that wrap one another RoundTripper-style
//!   and never mutate the request they are handed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jira_client::transport::BasicAuthTransport;
//! use jira_client::Client;
//!
//! # async fn run() -> Result<(), jira_client::Error> {
//! let transport = Arc::new(BasicAuthTransport::new("user@example.com", "api-token"));
//! let client = Client::builder("https://example.atlassian.net")
//!     .transport(transport)
//!     .build()?;
//!
//! let issue = client.issues().get("PROJ-123").await?;
//! println!("{}: {:?}", issue.key, issue.summary());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod issues;
pub mod models;
pub mod request;
pub mod transport;

pub use client::{ApiResponse, AuthType, Client, ClientBuilder};
pub use error::{ApiResponseError, Error, Result};
pub use issues::{IssueService, SearchOptions};
pub use models::{Issue, SearchResult, Session};
