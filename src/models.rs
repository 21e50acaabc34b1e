//! Typed JIRA API structures.
//!
//! Only the types the client core and the issue service need; endpoint
//! methods decode everything else through [`ApiResponse::json`](crate::ApiResponse::json).

use serde::{Deserialize, Serialize};

use crate::transport::SessionCookie;

/// An authenticated session, as returned by `POST /rest/auth/1/session`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The session cookie name and value reported in the body.
    #[serde(default)]
    pub session: Option<SessionInfo>,
    /// Login counters for the authenticated user.
    #[serde(default)]
    pub login_info: Option<LoginInfo>,
    /// Cookies captured from the login response headers.
    #[serde(skip)]
    pub cookies: Vec<SessionCookie>,
}

/// The named session cookie of a login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub value: String,
}

/// Login statistics reported by the session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInfo {
    #[serde(default)]
    pub failed_login_count: u32,
    #[serde(default)]
    pub login_count: u32,
    #[serde(default)]
    pub last_failed_login_time: Option<String>,
    #[serde(default)]
    pub previous_login_time: Option<String>,
}

/// A JIRA issue.
///
/// Returned by `GET /rest/api/2/issue/{issueKey}` or as part of search
/// results. Fields outside the common set stay available through `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// The issue ID.
    pub id: String,
    /// The issue key (e.g., "PROJ-123").
    pub key: String,
    /// URL of the issue resource.
    #[serde(rename = "self")]
    pub self_url: String,
    /// The issue fields, kept as raw JSON.
    #[serde(default)]
    pub fields: serde_json::Value,
}

impl Issue {
    /// Get the issue summary, if present.
    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(|s| s.as_str())
    }

    /// Get the issue status name, if present.
    pub fn status(&self) -> Option<&str> {
        self.fields
            .get("status")
            .and_then(|s| s.get("name"))
            .and_then(|n| n.as_str())
    }
}

/// Search result from a JQL query.
///
/// Returned by `GET /rest/api/2/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The index of the first result.
    #[serde(default)]
    pub start_at: u32,
    /// Maximum results requested.
    #[serde(default)]
    pub max_results: u32,
    /// Total number of matching issues.
    #[serde(default)]
    pub total: u32,
    /// The list of issues.
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl SearchResult {
    /// Check if there are more pages of results.
    pub fn has_more(&self) -> bool {
        self.start_at + (self.issues.len() as u32) < self.total
    }

    /// Get the starting index for the next page.
    pub fn next_start(&self) -> u32 {
        self.start_at + self.issues.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_deserializes_with_field_access() {
        let issue: Issue = serde_json::from_str(
            r#"{
                "id": "10000",
                "key": "PROJ-1",
                "self": "https://jira.example.com/rest/api/2/issue/10000",
                "fields": {"summary": "Fix the flux capacitor", "status": {"name": "Open"}}
            }"#,
        )
        .unwrap();

        assert_eq!(issue.key, "PROJ-1");
        assert_eq!(issue.summary(), Some("Fix the flux capacitor"));
        assert_eq!(issue.status(), Some("Open"));
    }

    #[test]
    fn test_search_result_pagination() {
        let result: SearchResult = serde_json::from_str(
            r#"{"startAt": 0, "maxResults": 2, "total": 3, "issues": [
                {"id": "1", "key": "A-1", "self": "u", "fields": {}},
                {"id": "2", "key": "A-2", "self": "u", "fields": {}}
            ]}"#,
        )
        .unwrap();

        assert!(result.has_more());
        assert_eq!(result.next_start(), 2);
    }

    #[test]
    fn test_session_deserializes_login_info() {
        let session: Session = serde_json::from_str(
            r#"{
                "session": {"name": "JSESSIONID", "value": "abc123"},
                "loginInfo": {"failedLoginCount": 1, "loginCount": 12}
            }"#,
        )
        .unwrap();

        assert_eq!(session.session.unwrap().name, "JSESSIONID");
        assert_eq!(session.login_info.unwrap().login_count, 12);
        assert!(session.cookies.is_empty());
    }
}
