//! Outgoing webhook delivery over HTTP.
//!
//! Each configured hook receives the push payload as a JSON POST. Delivery
//! is best effort: one attempt per hook, no retries. A hook marked
//! `default_branch_only` is skipped for pushes to any other branch.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::signature::{SIGNATURE_HEADER, sign};
use crate::payload::PushEvent;

/// Header naming the kind of hook event.
pub const EVENT_HEADER: &str = "X-Push-Event";

/// Value of [`EVENT_HEADER`] for push payloads.
pub const PUSH_EVENT: &str = "Push Hook";

/// A configured webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTarget {
    pub url: String,
    /// Signing secret; unsigned when absent.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub default_branch_only: bool,
}

impl WebhookTarget {
    /// Whether this hook wants a push with the given default-branch flag.
    pub fn accepts(&self, default_branch: bool) -> bool {
        default_branch || !self.default_branch_only
    }
}

/// Errors from webhook delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Some hooks failed; the rest were delivered.
    #[error("{failed} of {attempted} webhook deliveries failed: {}", .errors.join("; "))]
    Failed {
        failed: usize,
        attempted: usize,
        errors: Vec<String>,
    },
}

/// Delivers push payloads to a fixed set of hooks.
#[derive(Debug, Clone)]
pub struct HttpWebhookTransport {
    client: Client,
    targets: Vec<WebhookTarget>,
}

impl HttpWebhookTransport {
    pub fn new(targets: Vec<WebhookTarget>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(HttpWebhookTransport { client, targets })
    }

    /// Delivers `event` to every hook that accepts it, concurrently.
    ///
    /// Returns the number of hooks that received the payload.
    pub async fn deliver(
        &self,
        event: &PushEvent,
        default_branch: bool,
    ) -> Result<usize, DeliveryError> {
        let body = serde_json::to_vec(event)?;
        let targets: Vec<_> = self
            .targets
            .iter()
            .filter(|t| t.accepts(default_branch))
            .collect();
        let attempted = targets.len();

        let results = join_all(targets.into_iter().map(|t| self.post(t, &body))).await;
        let errors: Vec<String> = results.into_iter().filter_map(|r| r.err()).collect();
        if errors.is_empty() {
            return Ok(attempted);
        }
        Err(DeliveryError::Failed {
            failed: errors.len(),
            attempted,
            errors,
        })
    }

    async fn post(&self, target: &WebhookTarget, body: &[u8]) -> Result<(), String> {
        let mut request = self
            .client
            .post(&target.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(EVENT_HEADER, PUSH_EVENT)
            .body(body.to_vec());
        if let Some(secret) = &target.secret {
            request = request.header(SIGNATURE_HEADER, sign(body, secret.as_bytes()));
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                debug!(url = %target.url, status, "webhook delivered");
                Ok(())
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(url = %target.url, status, "webhook rejected");
                Err(format!("{}: HTTP {}", target.url, response.status()))
            }
            Err(e) => {
                warn!(url = %target.url, error = %e, "webhook delivery failed");
                Err(format!("{}: {}", target.url, e))
            }
        }
    }
}
