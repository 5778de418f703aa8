//! Cross-reference notes for issues a commit mentions.

use tracing::{debug, warn};

use crate::effects::{PlatformEffect, PlatformInterpreter, PlatformResponse};
use crate::payload::CommitSummary;
use crate::scanner::IssueReference;
use crate::trackers::{IssueTracker, NoteOutcome, ReferenceContext};
use crate::types::User;

/// The user a commit's references are attributed to: the local account with
/// the commit author's email if there is one, otherwise the pusher.
pub async fn resolve_author<P: PlatformInterpreter>(
    platform: &P,
    commit: &CommitSummary,
    pusher: &User,
) -> User {
    let effect = PlatformEffect::FindUserByEmail {
        email: commit.author.email.clone(),
    };
    match platform.interpret(effect).await {
        Ok(PlatformResponse::User(Some(user))) => user,
        Ok(PlatformResponse::User(None)) => pusher.clone(),
        Ok(other) => {
            warn!(response = ?other, "unexpected response to FindUserByEmail");
            pusher.clone()
        }
        Err(e) => {
            warn!(commit = %commit.id.short(), error = %e, "author lookup failed, using pusher");
            pusher.clone()
        }
    }
}

/// Records a non-closing reference. Failures are logged and swallowed;
/// returns the outcome when the tracker accepted the call.
pub async fn notify_reference<T: IssueTracker>(
    tracker: &T,
    ctx: &ReferenceContext<'_>,
    reference: &IssueReference,
) -> Option<NoteOutcome> {
    debug_assert!(!reference.is_closing);
    match tracker.cross_reference(ctx, &reference.issue).await {
        Ok(outcome) => {
            debug!(
                issue = %reference.issue,
                commit = %ctx.commit.id.short(),
                ?outcome,
                "cross-reference recorded"
            );
            Some(outcome)
        }
        Err(e) => {
            warn!(
                issue = %reference.issue,
                commit = %ctx.commit.id.short(),
                error = %e,
                "cross-reference failed"
            );
            None
        }
    }
}
