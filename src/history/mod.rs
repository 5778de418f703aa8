//! Commit enumeration for a push.
//!
//! Given a classified ref update, decides which commits the push introduced.
//! Branch updates use a plain revision range. Branch creations have no natural
//! lower bound, so the resolver tries three tiers in order and keeps the first
//! non-empty answer:
//!
//! 1. the range from the blank sentinel to the new revision (usually empty);
//! 2. when the new branch is the repository's HEAD branch, everything reachable
//!    from that branch, so the first push to the default branch reports the
//!    full pre-existing history;
//! 3. the full ancestry of the new revision.
//!
//! History failures never fail the push: a failed query counts as an empty
//! answer and resolution moves on.

pub mod git;

pub use git::{GitHistory, HistoryError};

use tracing::{debug, warn};

use crate::effects::{HistoryEffect, HistoryInterpreter, HistoryResponse};
use crate::refs::{BRANCH_PREFIX, RefChange, RefKind, branch_name};
use crate::types::{Commit, Sha};

/// Resolves the commits introduced by a push, oldest first.
pub async fn resolve_commits<H: HistoryInterpreter>(
    history: &H,
    change: &RefChange,
    ref_name: &str,
    before: &Sha,
    after: &Sha,
) -> Vec<Commit> {
    match change.kind {
        RefKind::BranchUpdated => {
            query_commits(
                history,
                HistoryEffect::CommitsBetween {
                    from: before.clone(),
                    to: after.clone(),
                },
            )
            .await
        }
        RefKind::BranchCreated => resolve_new_branch(history, ref_name, after).await,
        RefKind::BranchRemoved | RefKind::NonBranchRef => Vec::new(),
    }
}

async fn resolve_new_branch<H: HistoryInterpreter>(
    history: &H,
    ref_name: &str,
    after: &Sha,
) -> Vec<Commit> {
    let commits = query_commits(
        history,
        HistoryEffect::CommitsBetween {
            from: Sha::blank(),
            to: after.clone(),
        },
    )
    .await;
    if !commits.is_empty() {
        debug!(count = commits.len(), "new branch resolved from blank range");
        return commits;
    }

    let branch = branch_name(ref_name);
    if branch.is_some() && head_branch(history).await.as_deref() == branch {
        let commits = query_commits(
            history,
            HistoryEffect::CommitsFrom {
                rev: ref_name.to_string(),
            },
        )
        .await;
        if !commits.is_empty() {
            debug!(count = commits.len(), "new branch resolved from HEAD branch");
            return commits;
        }
    }

    let commits = query_commits(
        history,
        HistoryEffect::CommitsFrom {
            rev: after.to_string(),
        },
    )
    .await;
    debug!(count = commits.len(), "new branch resolved from full ancestry");
    commits
}

async fn query_commits<H: HistoryInterpreter>(history: &H, effect: HistoryEffect) -> Vec<Commit> {
    match history.interpret(effect.clone()).await {
        Ok(HistoryResponse::Commits(commits)) => commits,
        Ok(other) => {
            warn!(?effect, response = ?other, "unexpected history response");
            Vec::new()
        }
        Err(e) => {
            warn!(?effect, error = %e, "history query failed, treating as empty");
            Vec::new()
        }
    }
}

async fn head_branch<H: HistoryInterpreter>(history: &H) -> Option<String> {
    match history.interpret(HistoryEffect::HeadBranch).await {
        Ok(HistoryResponse::Branch(branch)) => {
            branch.map(|b| b.strip_prefix(BRANCH_PREFIX).map(str::to_string).unwrap_or(b))
        }
        Ok(other) => {
            warn!(response = ?other, "unexpected history response to HeadBranch");
            None
        }
        Err(e) => {
            warn!(error = %e, "could not read HEAD branch");
            None
        }
    }
}
