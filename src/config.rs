//! Service configuration, read from a TOML file at startup.
//!
//! ```toml
//! listen = "0.0.0.0:3000"
//! base_url = "http://git.example.com"
//! repos_dir = "/srv/git"
//! state_dir = "/var/lib/push-hooks"
//! push_secret = "..."
//!
//! [tracker]
//! kind = "external"
//! api_url = "https://jira.example.com"
//! username = "bot"
//! password = "..."
//! close_transition_id = 2
//!
//! [[webhooks]]
//! url = "https://ci.example.com/hook"
//! secret = "..."
//! default_branch_only = true
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::effects::PlatformInterpreter;
use crate::trackers::{AnyTracker, ExternalTracker, InternalTracker, JiraClient, RemoteApiError};
use crate::webhooks::WebhookTarget;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Web root used to build repository and commit URLs.
    pub base_url: String,
    /// Directory holding bare repositories as `{path_with_namespace}.git`.
    pub repos_dir: PathBuf,
    pub state_dir: PathBuf,
    /// Shared secret signing incoming push notifications.
    pub push_secret: String,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub webhooks: Vec<WebhookTarget>,
    #[serde(default = "default_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerConfig {
    #[default]
    Internal,
    External(ExternalTrackerConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalTrackerConfig {
    pub api_url: String,
    pub username: String,
    pub password: String,
    /// Only keys with this prefix are treated as tracker issues.
    #[serde(default)]
    pub project_key: Option<String>,
    pub close_transition_id: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_timeout_secs() -> u64 {
    10
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}

impl TrackerConfig {
    /// Builds the configured tracker. The internal tracker works against
    /// `platform`.
    pub fn build<P: PlatformInterpreter>(
        &self,
        platform: P,
    ) -> Result<AnyTracker<P, JiraClient>, RemoteApiError> {
        Ok(match self {
            TrackerConfig::Internal => AnyTracker::Internal(InternalTracker::new(platform)),
            TrackerConfig::External(cfg) => {
                let client = JiraClient::new(
                    &cfg.api_url,
                    &cfg.username,
                    &cfg.password,
                    Duration::from_secs(cfg.timeout_secs),
                )?;
                AnyTracker::External(ExternalTracker::new(
                    client,
                    cfg.project_key.clone(),
                    cfg.close_transition_id,
                ))
            }
        })
    }
}
