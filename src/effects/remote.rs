//! External issue tracker effect types.
//!
//! These describe calls against a remote ticketing API as data. The
//! interpreter is constructed with the tracker's base URL and credentials.

use serde::{Deserialize, Serialize};

/// A remote tracker operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteEffect {
    /// Move an issue through a workflow transition.
    TransitionIssue {
        /// Issue key, e.g. `JIRA-1`.
        issue_key: String,
        /// The tracker's numeric transition identifier.
        transition_id: u64,
    },

    /// Post a comment on an issue.
    PostComment { issue_key: String, body: String },
}

/// Response from a remote effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteResponse {
    /// The call was accepted.
    Ok,
}
