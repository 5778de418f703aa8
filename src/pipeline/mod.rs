//! The push pipeline.
//!
//! One [`PushPipeline::process`] call handles one ref update:
//!
//! ```text
//! classify ─► resolve commits ─► build payload ─► append event
//!                    │                  └───────► dispatch (protect, webhook)
//!                    └─► per commit, concurrently: scan ─► notify | close
//! ```
//!
//! Only precondition violations (both revisions blank, missing project or
//! user identity) fail the call, and they are detected before any effect is
//! issued. Everything after that degrades: failures are logged and reflected
//! in the returned [`PushOutcome`].

#[cfg(test)]
mod tests;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::closer::close_reference;
use crate::dispatch::{dispatch, plan_dispatch};
use crate::effects::{HistoryInterpreter, PlatformEffect, PlatformInterpreter, PlatformResponse};
use crate::history::resolve_commits;
use crate::notify::{notify_reference, resolve_author};
use crate::payload::{CommitSummary, PayloadError, PayloadInput, PushEvent, build_push_event};
use crate::refs::{RefChange, classify};
use crate::scanner::scan;
use crate::trackers::{IssueTracker, NoteOutcome, ReferenceContext};
use crate::types::{Commit, EventId, Project, Sha, User};

/// Errors that reject a push outright.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid push: {0}")]
    Payload(#[from] PayloadError),
}

/// A ref update as received from the git boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRequest {
    pub before: Sha,
    pub after: Sha,
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// What a push did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    pub change: RefChange,
    /// `None` when the event log could not record the push.
    pub event_id: Option<EventId>,
    pub commit_count: usize,
    pub webhook_delivered: bool,
    pub protected_branch: Option<String>,
    /// Resolved references across all commits.
    pub references: usize,
    pub notes_created: usize,
    pub issues_closed: usize,
}

/// Per-commit reference tallies.
#[derive(Debug, Default, Clone, Copy)]
struct ReferenceTally {
    references: usize,
    notes_created: usize,
    issues_closed: usize,
}

/// Processes pushes for one platform and tracker.
#[derive(Debug, Clone)]
pub struct PushPipeline<P, T> {
    platform: P,
    tracker: T,
    base_url: String,
}

impl<P, T> PushPipeline<P, T>
where
    P: PlatformInterpreter + Sync,
    T: IssueTracker,
{
    pub fn new(platform: P, tracker: T, base_url: impl Into<String>) -> Self {
        PushPipeline {
            platform,
            tracker,
            base_url: base_url.into(),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Processes one push against the repository `history`.
    #[instrument(
        skip_all,
        fields(
            project_id = %project.id,
            ref_name = %request.ref_name,
            before = %request.before.short(),
            after = %request.after.short()
        )
    )]
    pub async fn process<H>(
        &self,
        history: &H,
        request: &PushRequest,
        project: &Project,
        user: &User,
    ) -> Result<PushOutcome, PipelineError>
    where
        H: HistoryInterpreter + Sync,
    {
        // Reject malformed pushes before touching anything.
        build_push_event(self.payload_input(request, project, user, &[]))?;

        let change = classify(
            &request.before,
            &request.after,
            &request.ref_name,
            project.default_branch.as_deref(),
        );
        debug!(
            kind = ?change.kind,
            is_default_branch = change.is_default_branch,
            "classified push"
        );

        let commits = resolve_commits(
            history,
            &change,
            &request.ref_name,
            &request.before,
            &request.after,
        )
        .await;
        let event = build_push_event(self.payload_input(request, project, user, &commits))?;

        let event_id = self.record(&event).await;
        let dispatched = dispatch(&self.platform, plan_dispatch(project, &change, &event)).await;

        let tallies = join_all(
            event
                .commits
                .iter()
                .map(|commit| self.process_references(&change, project, user, commit)),
        )
        .await;
        let tally = tallies
            .into_iter()
            .fold(ReferenceTally::default(), |acc, t| ReferenceTally {
                references: acc.references + t.references,
                notes_created: acc.notes_created + t.notes_created,
                issues_closed: acc.issues_closed + t.issues_closed,
            });

        let outcome = PushOutcome {
            change,
            event_id,
            commit_count: event.commits.len(),
            webhook_delivered: dispatched.webhook_delivered,
            protected_branch: dispatched.protected_branch,
            references: tally.references,
            notes_created: tally.notes_created,
            issues_closed: tally.issues_closed,
        };
        info!(
            commits = outcome.commit_count,
            references = outcome.references,
            notes = outcome.notes_created,
            closed = outcome.issues_closed,
            "push processed"
        );
        Ok(outcome)
    }

    fn payload_input<'a>(
        &'a self,
        request: &'a PushRequest,
        project: &'a Project,
        user: &'a User,
        commits: &'a [Commit],
    ) -> PayloadInput<'a> {
        PayloadInput {
            base_url: &self.base_url,
            project,
            user,
            before: &request.before,
            after: &request.after,
            ref_name: &request.ref_name,
            commits,
        }
    }

    /// Appends the event to the log, logging failures.
    async fn record(&self, event: &PushEvent) -> Option<EventId> {
        let effect = PlatformEffect::AppendEvent {
            event: event.clone(),
        };
        match self.platform.interpret(effect).await {
            Ok(PlatformResponse::EventId(id)) => Some(id),
            Ok(other) => {
                warn!(response = ?other, "unexpected response to AppendEvent");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to record push event");
                None
            }
        }
    }

    async fn process_references(
        &self,
        change: &RefChange,
        project: &Project,
        pusher: &User,
        commit: &CommitSummary,
    ) -> ReferenceTally {
        let references = scan(&self.tracker, project, commit).await;
        let mut tally = ReferenceTally {
            references: references.len(),
            ..ReferenceTally::default()
        };
        if references.is_empty() {
            return tally;
        }

        let author = resolve_author(&self.platform, commit, pusher).await;
        let ctx = ReferenceContext {
            project,
            commit,
            pusher,
            author: &author,
        };
        for reference in &references {
            if reference.is_closing {
                if let Some(outcome) = close_reference(&self.tracker, change, &ctx, reference).await
                    && outcome.closed_now()
                {
                    tally.issues_closed += 1;
                }
            } else if let Some(NoteOutcome::Created | NoteOutcome::Commented) =
                notify_reference(&self.tracker, &ctx, reference).await
            {
                tally.notes_created += 1;
            }
        }
        tally
    }
}
