//! Issue tracker backends.
//!
//! The pipeline talks to one tracker per deployment through the
//! [`IssueTracker`] capability trait. Two implementations exist:
//!
//! - [`InternalTracker`]: issues live in the platform store, references are
//!   `#N`, mentions become cross-reference notes.
//! - [`ExternalTracker`]: issues live in a remote ticketing system,
//!   references are `KEY-N`, everything becomes remote calls.
//!
//! [`AnyTracker`] selects between them from configuration.

pub mod external;
pub mod internal;
pub mod jira;

pub use external::ExternalTracker;
pub use internal::InternalTracker;
pub use jira::{JiraClient, RemoteApiError, RemoteErrorKind};

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::{PlatformInterpreter, RemoteInterpreter};
use crate::payload::CommitSummary;
use crate::scanner::ReferencePatterns;
use crate::types::{IssueId, IssueIid, Project, User};

/// A resolved issue on either tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tracker", rename_all = "snake_case")]
pub enum IssueHandle {
    /// An issue in the platform store.
    Internal { id: IssueId, iid: IssueIid },
    /// A remote issue, e.g. `JIRA-1`.
    External { key: String },
}

impl fmt::Display for IssueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueHandle::Internal { iid, .. } => write!(f, "{iid}"),
            IssueHandle::External { key } => write!(f, "{key}"),
        }
    }
}

/// Who and what a reference came from.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceContext<'a> {
    pub project: &'a Project,
    pub commit: &'a CommitSummary,
    /// The user who performed the push.
    pub pusher: &'a User,
    /// The commit author's local account, or the pusher when the author is
    /// unknown.
    pub author: &'a User,
}

/// Result of closing an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyClosed,
    /// Remote calls were issued; each flag says whether that call succeeded.
    Requested { transitioned: bool, commented: bool },
}

impl CloseOutcome {
    /// Whether this call moved the issue to closed.
    pub fn closed_now(&self) -> bool {
        matches!(
            self,
            CloseOutcome::Closed
                | CloseOutcome::Requested {
                    transitioned: true,
                    ..
                }
        )
    }
}

/// Result of recording a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOutcome {
    Created,
    AlreadyExists,
    /// A remote comment was posted.
    Commented,
}

/// Errors from tracker operations. The pipeline logs these and moves on.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("platform error: {0}")]
    Platform(String),

    #[error("remote tracker error: {0}")]
    Remote(String),

    #[error("unexpected response to {effect}: {response}")]
    UnexpectedResponse {
        effect: &'static str,
        response: String,
    },

    /// The handle belongs to the other tracker.
    #[error("issue {0} does not belong to this tracker")]
    ForeignIssue(IssueHandle),
}

/// The capability interface the pipeline uses to talk to a tracker.
pub trait IssueTracker: Send + Sync {
    /// Reference patterns for commit messages.
    fn patterns(&self) -> &ReferencePatterns;

    /// Resolves a token to an issue, or `None` when it names nothing.
    fn resolve(
        &self,
        project: &Project,
        token: &str,
    ) -> impl Future<Output = Option<IssueHandle>> + Send;

    /// Closes an issue on behalf of a commit.
    fn close(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> impl Future<Output = Result<CloseOutcome, TrackerError>> + Send;

    /// Records that a commit mentions an issue.
    fn cross_reference(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> impl Future<Output = Result<NoteOutcome, TrackerError>> + Send;
}

/// The tracker selected by configuration.
#[derive(Debug, Clone)]
pub enum AnyTracker<P, R> {
    Internal(InternalTracker<P>),
    External(ExternalTracker<R>),
}

impl<P, R> IssueTracker for AnyTracker<P, R>
where
    P: PlatformInterpreter + Send + Sync,
    R: RemoteInterpreter + Send + Sync,
{
    fn patterns(&self) -> &ReferencePatterns {
        match self {
            AnyTracker::Internal(t) => t.patterns(),
            AnyTracker::External(t) => t.patterns(),
        }
    }

    async fn resolve(&self, project: &Project, token: &str) -> Option<IssueHandle> {
        match self {
            AnyTracker::Internal(t) => t.resolve(project, token).await,
            AnyTracker::External(t) => t.resolve(project, token).await,
        }
    }

    async fn close(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> Result<CloseOutcome, TrackerError> {
        match self {
            AnyTracker::Internal(t) => t.close(ctx, issue).await,
            AnyTracker::External(t) => t.close(ctx, issue).await,
        }
    }

    async fn cross_reference(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> Result<NoteOutcome, TrackerError> {
        match self {
            AnyTracker::Internal(t) => t.cross_reference(ctx, issue).await,
            AnyTracker::External(t) => t.cross_reference(ctx, issue).await,
        }
    }
}
