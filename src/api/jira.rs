//! Jira Cloud issue lookup.
//!
//! Read-only: one issue fetch per hotfix, used to decorate the generated
//! branch name and print context for the person doing the fix.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use tracing::debug;

use super::error::ApiError;

const PROVIDER_NAME: &str = "jira";

/// The subset of issue fields surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetails {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub priority: Option<String>,
    pub reporter: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub epic: Option<String>,
    pub latest_comment: Option<String>,
}

/// Issue lookup seam; the real client talks to Jira Cloud, tests use a
/// fixed-answer fake.
#[async_trait]
pub trait IssueTracker {
    async fn fetch_issue(&self, key: &str) -> Result<IssueDetails, ApiError>;
}

/// Jira Cloud API client
pub struct JiraTracker {
    domain: String,
    email: String,
    api_token: String,
    client: Client,
}

impl JiraTracker {
    pub fn new(domain: String, email: String, api_token: String) -> Self {
        Self {
            domain,
            email,
            api_token,
            client: Client::new(),
        }
    }

    /// Create from environment variables
    ///
    /// Required environment variables:
    /// - STAGEHAND_JIRA_DOMAIN: Your Jira domain (e.g., "your-domain.atlassian.net")
    /// - STAGEHAND_JIRA_EMAIL: Your Atlassian account email
    /// - STAGEHAND_JIRA_TOKEN: Your Jira API token
    pub fn from_env() -> Result<Self, ApiError> {
        let domain = env::var("STAGEHAND_JIRA_DOMAIN").ok();
        let email = env::var("STAGEHAND_JIRA_EMAIL").ok();
        let token = env::var("STAGEHAND_JIRA_TOKEN").ok();

        match (domain, email, token) {
            (Some(d), Some(e), Some(t)) if !d.is_empty() && !e.is_empty() && !t.is_empty() => {
                Ok(Self::new(d, e, t))
            }
            _ => Err(ApiError::not_configured(PROVIDER_NAME)),
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}/rest/api/2", self.domain)
    }

    /// Basic Auth header value (simple Base64 encoding)
    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.email, self.api_token);
        let encoded = simple_base64_encode(credentials.as_bytes());
        format!("Basic {encoded}")
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url(), path);
        debug!("Jira GET: {url}");

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status.as_u16() {
                401 => Err(ApiError::Unauthorized {
                    provider: PROVIDER_NAME.to_string(),
                }),
                403 => Err(ApiError::Forbidden {
                    provider: PROVIDER_NAME.to_string(),
                }),
                404 => Err(ApiError::http(PROVIDER_NAME, 404, body)),
                429 => Err(ApiError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                }),
                _ => Err(ApiError::http(PROVIDER_NAME, status.as_u16(), body)),
            };
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::http(PROVIDER_NAME, 0, format!("Parse error: {e}")))
    }
}

#[async_trait]
impl IssueTracker for JiraTracker {
    async fn fetch_issue(&self, key: &str) -> Result<IssueDetails, ApiError> {
        let path = format!(
            "/issue/{key}?fields=summary,status,priority,reporter,assignee,duedate,parent,comment"
        );
        let issue: JiraIssue = self.get(&path).await.map_err(|e| {
            // A 404 on the issue endpoint means the key does not exist.
            if let ApiError::Http { status: 404, .. } = e {
                ApiError::not_found(PROVIDER_NAME, key)
            } else {
                e
            }
        })?;
        Ok(issue.into_details())
    }
}

// ─── Jira API response types ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

#[derive(Debug, Deserialize)]
struct JiraFields {
    #[serde(default)]
    summary: String,
    status: Option<JiraNamed>,
    priority: Option<JiraNamed>,
    reporter: Option<JiraUser>,
    assignee: Option<JiraUser>,
    duedate: Option<String>,
    parent: Option<JiraParent>,
    comment: Option<JiraComments>,
}

#[derive(Debug, Deserialize)]
struct JiraNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JiraUser {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct JiraParent {
    fields: Option<JiraParentFields>,
}

#[derive(Debug, Deserialize)]
struct JiraParentFields {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraComments {
    #[serde(default)]
    comments: Vec<JiraComment>,
}

#[derive(Debug, Deserialize)]
struct JiraComment {
    body: Option<String>,
}

impl JiraIssue {
    fn into_details(self) -> IssueDetails {
        let fields = self.fields;
        IssueDetails {
            key: self.key,
            summary: fields.summary,
            status: fields
                .status
                .map_or_else(|| "Unknown".to_string(), |s| s.name),
            priority: fields.priority.map(|p| p.name),
            reporter: fields.reporter.map(|u| u.display_name),
            assignee: fields.assignee.map(|u| u.display_name),
            due_date: fields.duedate,
            epic: fields.parent.and_then(|p| p.fields).and_then(|f| f.summary),
            latest_comment: fields
                .comment
                .and_then(|c| c.comments.into_iter().last())
                .and_then(|c| c.body),
        }
    }
}

/// Simple Base64 encoding implementation (for Basic Auth only)
fn simple_base64_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut result = String::new();
    let mut chunks = data.chunks_exact(3);

    for chunk in chunks.by_ref() {
        let n = ((chunk[0] as u32) << 16) | ((chunk[1] as u32) << 8) | (chunk[2] as u32);
        result.push(ALPHABET[(n >> 18 & 0x3F) as usize] as char);
        result.push(ALPHABET[(n >> 12 & 0x3F) as usize] as char);
        result.push(ALPHABET[(n >> 6 & 0x3F) as usize] as char);
        result.push(ALPHABET[(n & 0x3F) as usize] as char);
    }

    let remainder = chunks.remainder();
    if remainder.len() == 1 {
        let n = (remainder[0] as u32) << 16;
        result.push(ALPHABET[(n >> 18 & 0x3F) as usize] as char);
        result.push(ALPHABET[(n >> 12 & 0x3F) as usize] as char);
        result.push_str("==");
    } else if remainder.len() == 2 {
        let n = ((remainder[0] as u32) << 16) | ((remainder[1] as u32) << 8);
        result.push(ALPHABET[(n >> 18 & 0x3F) as usize] as char);
        result.push(ALPHABET[(n >> 12 & 0x3F) as usize] as char);
        result.push(ALPHABET[(n >> 6 & 0x3F) as usize] as char);
        result.push('=');
    }

    result
}
