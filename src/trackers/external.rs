//! A remote ticketing system reached through a [`RemoteInterpreter`].
//!
//! There are no local records: a well-formed `KEY-N` token resolves directly
//! to a remote issue key. Closing issues a workflow transition and posts a
//! comment linking the commit; both calls are independent and neither
//! failure is propagated.
//!
//! The remote keeps no record of which commits were already announced, so a
//! commit seen by two pushes is commented on twice.

use tracing::{debug, warn};

use super::{CloseOutcome, IssueHandle, IssueTracker, NoteOutcome, ReferenceContext, TrackerError};
use crate::effects::{RemoteEffect, RemoteInterpreter};
use crate::scanner::ReferencePatterns;
use crate::types::Project;

/// Comment posted when a commit closes an issue.
pub fn closing_comment(ctx: &ReferenceContext<'_>) -> String {
    format!("Issue solved with [{}|{}].", ctx.commit.id, ctx.commit.url)
}

/// Comment posted when a commit mentions an issue.
pub fn mention_comment(ctx: &ReferenceContext<'_>) -> String {
    format!(
        "{} mentioned this issue in [a commit of {}|{}]:\n'{}'",
        ctx.author.name,
        ctx.project.path_with_namespace,
        ctx.commit.url,
        ctx.commit.title()
    )
}

/// Splits `KEY-N` into its project key, checking the number part.
fn project_key(token: &str) -> Option<&str> {
    let (key, number) = token.rsplit_once('-')?;
    let well_formed = !key.is_empty()
        && key.starts_with(|c: char| c.is_ascii_uppercase())
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit());
    well_formed.then_some(key)
}

/// Issues on a remote tracker, referenced as `KEY-N`.
#[derive(Debug, Clone)]
pub struct ExternalTracker<R> {
    remote: R,
    /// When set, only tokens with this project key resolve.
    project_key: Option<String>,
    /// The remote workflow transition that closes an issue.
    close_transition_id: u64,
}

impl<R> ExternalTracker<R> {
    pub fn new(remote: R, project_key: Option<String>, close_transition_id: u64) -> Self {
        ExternalTracker {
            remote,
            project_key,
            close_transition_id,
        }
    }
}

impl<R: RemoteInterpreter> ExternalTracker<R> {
    async fn call(&self, effect: RemoteEffect) -> Result<(), TrackerError> {
        self.remote
            .interpret(effect)
            .await
            .map(|_| ())
            .map_err(|e| TrackerError::Remote(e.to_string()))
    }
}

impl<R> IssueTracker for ExternalTracker<R>
where
    R: RemoteInterpreter + Send + Sync,
{
    fn patterns(&self) -> &ReferencePatterns {
        ReferencePatterns::external()
    }

    async fn resolve(&self, _project: &Project, token: &str) -> Option<IssueHandle> {
        let key = project_key(token)?;
        if let Some(expected) = &self.project_key
            && key != expected
        {
            return None;
        }
        Some(IssueHandle::External {
            key: token.to_string(),
        })
    }

    async fn close(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> Result<CloseOutcome, TrackerError> {
        let IssueHandle::External { key } = issue else {
            return Err(TrackerError::ForeignIssue(issue.clone()));
        };

        let transition = self.call(RemoteEffect::TransitionIssue {
            issue_key: key.clone(),
            transition_id: self.close_transition_id,
        });
        let comment = self.call(RemoteEffect::PostComment {
            issue_key: key.clone(),
            body: closing_comment(ctx),
        });
        let (transition, comment) = tokio::join!(transition, comment);

        if let Err(e) = &transition {
            warn!(issue = %key, error = %e, "remote transition failed");
        }
        if let Err(e) = &comment {
            warn!(issue = %key, error = %e, "remote closing comment failed");
        }
        debug!(issue = %key, commit = %ctx.commit.id.short(), "remote close requested");
        Ok(CloseOutcome::Requested {
            transitioned: transition.is_ok(),
            commented: comment.is_ok(),
        })
    }

    async fn cross_reference(
        &self,
        ctx: &ReferenceContext<'_>,
        issue: &IssueHandle,
    ) -> Result<NoteOutcome, TrackerError> {
        let IssueHandle::External { key } = issue else {
            return Err(TrackerError::ForeignIssue(issue.clone()));
        };
        self.call(RemoteEffect::PostComment {
            issue_key: key.clone(),
            body: mention_comment(ctx),
        })
        .await?;
        Ok(NoteOutcome::Commented)
    }
}
