//! Jira REST interpreter for remote tracker effects.
//!
//! Errors are categorised the same way for every call:
//!
//! - **Transient**: 5xx, 429, timeouts and connection failures. The caller
//!   may retry a later push; this interpreter never retries itself.
//! - **Permanent**: every other 4xx (unknown issue, invalid transition,
//!   bad credentials) and malformed configuration.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::effects::{RemoteEffect, RemoteInterpreter, RemoteResponse};

/// The kind of remote API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Server-side or network failure; the same call may succeed later.
    Transient,
    /// The request itself is wrong and will keep failing.
    Permanent,
}

impl RemoteErrorKind {
    /// Categorises an HTTP status.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            RemoteErrorKind::Transient
        } else {
            RemoteErrorKind::Permanent
        }
    }
}

/// A remote tracker API error.
#[derive(Debug, Error)]
pub struct RemoteApiError {
    pub kind: RemoteErrorKind,

    /// The HTTP status code, if a response arrived.
    pub status_code: Option<u16>,

    pub message: String,

    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for RemoteApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "tracker API error (HTTP {}): {}", code, self.message),
            None => write!(f, "tracker API error: {}", self.message),
        }
    }
}

impl RemoteApiError {
    /// An error for a non-success HTTP response.
    pub fn from_response(status: StatusCode, body: String) -> Self {
        Self {
            kind: RemoteErrorKind::from_status(status),
            status_code: Some(status.as_u16()),
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
            source: None,
        }
    }

    /// Categorises a transport error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = match err.status() {
            Some(status) => RemoteErrorKind::from_status(status),
            None if err.is_timeout() || err.is_connect() || err.is_request() => {
                RemoteErrorKind::Transient
            }
            None => RemoteErrorKind::Permanent,
        };
        Self {
            kind,
            status_code,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// A Jira client authenticated with basic auth.
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    api_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraClient")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    /// Creates a client for the Jira instance at `api_url`. Every request is
    /// bounded by `timeout`.
    pub fn new(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteApiError::from_reqwest)?;
        Ok(JiraClient {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        })
    }

    fn issue_url(&self, issue_key: &str, action: &str) -> String {
        format!("{}/rest/api/2/issue/{}/{}", self.api_url, issue_key, action)
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<(), RemoteApiError> {
        trace!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let err = RemoteApiError::from_reqwest(e);
                warn!(%url, kind = ?err.kind, error = %err, "tracker call failed");
                err
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(%url, status = status.as_u16(), "tracker call succeeded");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let err = RemoteApiError::from_response(status, body);
        warn!(%url, status = status.as_u16(), kind = ?err.kind, "tracker call rejected");
        Err(err)
    }
}

/// JSON body for a transition request. Jira wants the id as a string.
fn transition_body(transition_id: u64) -> serde_json::Value {
    json!({ "transition": { "id": transition_id.to_string() } })
}

fn comment_body(body: &str) -> serde_json::Value {
    json!({ "body": body })
}

impl RemoteInterpreter for JiraClient {
    type Error = RemoteApiError;

    async fn interpret(&self, effect: RemoteEffect) -> Result<RemoteResponse, Self::Error> {
        match effect {
            RemoteEffect::TransitionIssue {
                issue_key,
                transition_id,
            } => {
                self.post(
                    self.issue_url(&issue_key, "transitions"),
                    transition_body(transition_id),
                )
                .await?
            }
            RemoteEffect::PostComment { issue_key, body } => {
                self.post(self.issue_url(&issue_key, "comment"), comment_body(&body))
                    .await?
            }
        }
        Ok(RemoteResponse::Ok)
    }
}
