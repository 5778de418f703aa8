//! Hosting platform effect types.
//!
//! The platform owns everything the pipeline reads or writes apart from
//! repository history and the external tracker: the event log, webhook
//! transport, protected branches, users, issues and notes.

use serde::{Deserialize, Serialize};

use crate::payload::PushEvent;
use crate::types::{EventId, IssueId, IssueIid, IssueRecord, ProjectId, Sha, User, UserId};

/// A note linking a commit to an issue it mentions.
///
/// The platform keeps at most one note per [`CrossReferenceNote::key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceNote {
    pub project_id: ProjectId,
    pub issue_id: IssueId,
    pub commit_id: Sha,
    pub author_id: UserId,
    pub body: String,
}

impl CrossReferenceNote {
    /// Uniqueness key: one note per (project, issue, commit).
    pub fn key(&self) -> (ProjectId, IssueId, &Sha) {
        (self.project_id, self.issue_id, &self.commit_id)
    }
}

/// A platform operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEffect {
    // ─── Push records ─────────────────────────────────────────────────────────
    /// Append a push event to the durable event log.
    AppendEvent { event: PushEvent },

    /// Deliver the push payload to the project's webhooks.
    DeliverWebhook {
        event: PushEvent,
        /// Whether the push targeted the default branch.
        default_branch: bool,
    },

    /// Record the default branch of a project that has none yet. A project
    /// that already has a default keeps it.
    SetDefaultBranch { project_id: ProjectId, branch: String },

    /// Create a protected-branch record.
    ProtectBranch {
        project_id: ProjectId,
        branch: String,
        developers_can_push: bool,
    },

    // ─── Lookups ──────────────────────────────────────────────────────────────
    /// Find a local user by email address (case-insensitive).
    FindUserByEmail { email: String },

    /// Find an issue by its project-scoped number.
    FindIssue { project_id: ProjectId, iid: IssueIid },

    // ─── Issue mutations ──────────────────────────────────────────────────────
    /// Create a cross-reference note unless one already exists for its key.
    CreateCrossReference { note: CrossReferenceNote },

    /// Close an issue. Closing a closed issue is a no-op.
    CloseIssue {
        project_id: ProjectId,
        iid: IssueIid,
        commit_id: Sha,
        closed_by: UserId,
    },
}

/// Response from a platform effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PlatformResponse {
    /// Operation completed with no specific return value.
    Ok,
    /// Response to `AppendEvent`.
    EventId(EventId),
    /// Response to `FindUserByEmail`.
    User(Option<User>),
    /// Response to `FindIssue`.
    Issue(Option<IssueRecord>),
    /// A record was created (`SetDefaultBranch`, `ProtectBranch`,
    /// `CreateCrossReference`).
    Created,
    /// The record already existed (`SetDefaultBranch`, `ProtectBranch`,
    /// `CreateCrossReference`).
    AlreadyExists,
    /// Response to `CloseIssue` when the issue was open.
    Closed,
    /// Response to `CloseIssue` when the issue was already closed.
    AlreadyClosed,
}
