//! The platform's own issue tracker.

use tracing::{debug, warn};

use super::{CloseOutcome, IssueHandle, IssueTracker, NoteOutcome, ReferenceContext, TrackerError};
use crate::effects::{CrossReferenceNote, PlatformEffect, PlatformInterpreter, PlatformResponse};
use crate::scanner::ReferencePatterns;
use crate::types::{IssueIid, Project};

/// Body of a cross-reference note.
pub fn mention_note_body(ctx: &ReferenceContext<'_>) -> String {
    format!("mentioned in commit {}", ctx.commit.id)
}

/// Issues stored by the platform, referenced as `#N`.
#[derive(Debug, Clone)]
pub struct InternalTracker<P> {
    platform: P,
}

impl<P> InternalTracker<P> {
    pub fn new(platform: P) -> Self {
        InternalTracker { platform }
    }
}

impl<P: PlatformInterpreter> InternalTracker<P> {
    async fn run(&self, effect: PlatformEffect) -> Result<PlatformResponse, TrackerError> {
        self.platform
            .interpret(effect)
            .await
            .map_err(|e| TrackerError::Platform(e.to_string()))
    }
}

/// Parses `#N` into an iid. Anything else is malformed.
fn parse_iid(token: &str) -> Option<IssueIid> {
    token
        .strip_prefix('#')
        .and_then(|n| n.parse::<u64>().ok())
        .map(IssueIid)
}

impl<P> IssueTracker for InternalTracker<P>
where
    P: PlatformInterpreter + Send + Sync,
{
    fn patterns(&self) -> &ReferencePatterns {
        ReferencePatterns::internal()
    }

    async fn resolve(&self, project: &Project, token: &str) -> Option<IssueHandle> {
        let iid = parse_iid(token)?;
        let effect = PlatformEffect::FindIssue {
            project_id: project.id,
            iid,
        };
        match self.run(effect).await {
            Ok(PlatformResponse::Issue(Some(issue))) => Some(IssueHandle::Internal {
                id: issue.id,
                iid: issue.iid,
            }),
            Ok(PlatformResponse::Issue(None)) => None,
            Ok(other) => {
                warn!(response = ?other, "unexpected response to FindIssue");
                None
            }
            Err(e) => {
                warn!(project_id = %project.id, %iid, error = %e, "issue lookup failed");
                None
            }
        }
    }

    async fn close(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> Result<CloseOutcome, TrackerError> {
        let IssueHandle::Internal { iid, .. } = issue else {
            return Err(TrackerError::ForeignIssue(issue.clone()));
        };
        let effect = PlatformEffect::CloseIssue {
            project_id: ctx.project.id,
            iid: *iid,
            commit_id: ctx.commit.id.clone(),
            closed_by: ctx.author.id,
        };
        match self.run(effect).await? {
            PlatformResponse::Closed => {
                debug!(issue = %iid, commit = %ctx.commit.id.short(), "issue closed");
                Ok(CloseOutcome::Closed)
            }
            PlatformResponse::AlreadyClosed => Ok(CloseOutcome::AlreadyClosed),
            other => Err(TrackerError::UnexpectedResponse {
                effect: "close_issue",
                response: format!("{other:?}"),
            }),
        }
    }

    async fn cross_reference(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> Result<NoteOutcome, TrackerError> {
        let IssueHandle::Internal { id, .. } = issue else {
            return Err(TrackerError::ForeignIssue(issue.clone()));
        };
        let note = CrossReferenceNote {
            project_id: ctx.project.id,
            issue_id: *id,
            commit_id: ctx.commit.id.clone(),
            author_id: ctx.author.id,
            body: mention_note_body(ctx),
        };
        match self.run(PlatformEffect::CreateCrossReference { note }).await? {
            PlatformResponse::Created => Ok(NoteOutcome::Created),
            PlatformResponse::AlreadyExists => Ok(NoteOutcome::AlreadyExists),
            other => Err(TrackerError::UnexpectedResponse {
                effect: "create_cross_reference",
                response: format!("{other:?}"),
            }),
        }
    }
}
