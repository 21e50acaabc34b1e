//! Thin endpoint wrappers for the issue resource.
//!
//! Each method builds a URL, dispatches through the client core, and decodes
//! the response; everything interesting happens in [`Client`].

use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::client::{ApiResponse, Client};
use crate::error::Result;
use crate::models::{Issue, SearchResult};
use crate::request::add_options;

/// Query options for [`IssueService::search`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// The index of the first issue to return (0-based).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u32>,
    /// Maximum number of issues to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    /// Comma-separated list of fields to include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}

/// Access to the issue endpoints of the JIRA REST API.
#[derive(Debug)]
pub struct IssueService<'a> {
    client: &'a Client,
}

impl Client {
    /// The issue service.
    pub fn issues(&self) -> IssueService<'_> {
        IssueService { client: self }
    }
}

impl IssueService<'_> {
    /// Get a single issue by key or ID.
    ///
    /// Calls `GET /rest/api/2/issue/{key}`.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get(&self, key: &str) -> Result<Issue> {
        debug!("Fetching issue");
        let path = format!("rest/api/2/issue/{}", key);
        let request = self
            .client
            .new_request::<()>(Method::GET, &path, None, &[])?;
        let response = self.client.send(request).await?;
        response.json()
    }

    /// Search for issues with a JQL query.
    ///
    /// Calls `GET /rest/api/2/search`.
    #[instrument(skip(self), fields(jql = %jql))]
    pub async fn search(&self, jql: &str, options: &SearchOptions) -> Result<SearchResult> {
        debug!("Searching issues");
        let mut url: Url = self.client.base_url().join("rest/api/2/search")?;
        url.query_pairs_mut().append_pair("jql", jql);
        add_options(&mut url, options)?;

        let request = self
            .client
            .new_request::<()>(Method::GET, url.as_str(), None, &[])?;
        let response = self.client.send(request).await?;
        response.json()
    }

    /// Create an issue from a JSON fields payload.
    ///
    /// Calls `POST /rest/api/2/issue` and returns the decoded response,
    /// typically `{"id": ..., "key": ..., "self": ...}`.
    #[instrument(skip(self, body))]
    pub async fn create<T: Serialize>(&self, body: &T) -> Result<ApiResponse> {
        debug!("Creating issue");
        let request =
            self.client
                .new_request(Method::POST, "rest/api/2/issue", Some(body), &[])?;
        self.client.send(request).await
    }
}
