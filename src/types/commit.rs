//! Commits as reported by the history store.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::ids::Sha;

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// A commit read from repository history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: Sha,
    /// Full commit message, subject and body.
    pub message: String,
    pub author: CommitAuthor,
    /// Author date, keeping the author's UTC offset.
    pub authored_at: DateTime<FixedOffset>,
}

impl Commit {
    /// The first line of the message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
