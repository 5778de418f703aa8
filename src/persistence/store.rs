//! File-backed platform store.
//!
//! [`LocalStore`] is the production [`PlatformInterpreter`]. It keeps users,
//! projects, issues, notes and protected branches in a [`StoreSnapshot`],
//! appends push events to an [`EventLog`], and hands webhook delivery to an
//! [`HttpWebhookTransport`].
//!
//! Mutations work on a copy of the snapshot; the copy only replaces the
//! in-memory state once it has been written to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::log::{EventLog, EventLogError};
use super::snapshot::{
    IssueClosure, ProtectedBranch, SnapshotError, StoreSnapshot, StoredNote, save_snapshot,
    try_load_snapshot,
};
use crate::effects::{CrossReferenceNote, PlatformEffect, PlatformInterpreter, PlatformResponse};
use crate::payload::PushEvent;
use crate::types::{IssueIid, IssueState, Project, ProjectId, Sha, User, UserId};
use crate::webhooks::{DeliveryError, HttpWebhookTransport};

/// Snapshot file name inside the state directory.
pub const SNAPSHOT_FILE: &str = "store.json";

/// Event log file name inside the state directory.
pub const EVENT_LOG_FILE: &str = "events.log";

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("webhook delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("project {0} not found")]
    UnknownProject(ProjectId),

    #[error("issue {project_id}#{iid} not found")]
    UnknownIssue { project_id: ProjectId, iid: IssueIid },
}

/// The platform's records, persisted under one state directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    inner: Arc<LocalStoreInner>,
}

#[derive(Debug)]
struct LocalStoreInner {
    snapshot_path: PathBuf,
    snapshot: Mutex<StoreSnapshot>,
    log: Mutex<EventLog>,
    webhooks: HttpWebhookTransport,
}

impl LocalStore {
    /// Opens the store in `state_dir`, creating empty files if needed.
    pub fn open(
        state_dir: impl AsRef<Path>,
        webhooks: HttpWebhookTransport,
    ) -> Result<Self, StoreError> {
        let state_dir = state_dir.as_ref();
        let snapshot_path = state_dir.join(SNAPSHOT_FILE);
        let snapshot = match try_load_snapshot(&snapshot_path)? {
            Some(snapshot) => snapshot,
            None => {
                let mut snapshot = StoreSnapshot::default();
                save_snapshot(&snapshot_path, &mut snapshot)?;
                snapshot
            }
        };
        let log = EventLog::open(state_dir.join(EVENT_LOG_FILE))?;
        info!(
            path = %snapshot_path.display(),
            projects = snapshot.projects.len(),
            users = snapshot.users.len(),
            issues = snapshot.issues.len(),
            "store opened"
        );

        Ok(LocalStore {
            inner: Arc::new(LocalStoreInner {
                snapshot_path,
                snapshot: Mutex::new(snapshot),
                log: Mutex::new(log),
                webhooks,
            }),
        })
    }

    pub async fn project(&self, id: ProjectId) -> Option<Project> {
        let snapshot = self.inner.snapshot.lock().await;
        snapshot.projects.iter().find(|p| p.id == id).cloned()
    }

    pub async fn user(&self, id: UserId) -> Option<User> {
        let snapshot = self.inner.snapshot.lock().await;
        snapshot.users.iter().find(|u| u.id == id).cloned()
    }

    /// A copy of everything currently stored.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot.lock().await.clone()
    }

    /// Applies `change` to a copy of the snapshot and persists it.
    ///
    /// `change` returns `None` to leave the store untouched.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut StoreSnapshot) -> Option<T>,
    ) -> Result<Option<T>, StoreError> {
        let mut snapshot = self.inner.snapshot.lock().await;
        let mut next = snapshot.clone();
        let Some(result) = change(&mut next) else {
            return Ok(None);
        };
        save_snapshot(&self.inner.snapshot_path, &mut next)?;
        *snapshot = next;
        Ok(Some(result))
    }

    async fn append_event(&self, event: PushEvent) -> Result<PlatformResponse, StoreError> {
        let logged = self.inner.log.lock().await.append(event)?;
        debug!(seq = %logged.seq, "push event recorded");
        Ok(PlatformResponse::EventId(logged.seq))
    }

    async fn set_default_branch(
        &self,
        project_id: ProjectId,
        branch: String,
    ) -> Result<PlatformResponse, StoreError> {
        if self.project(project_id).await.is_none() {
            return Err(StoreError::UnknownProject(project_id));
        }
        let set = self
            .mutate(|s| {
                let project = s.projects.iter_mut().find(|p| p.id == project_id)?;
                if project.default_branch.is_some() {
                    return None;
                }
                project.default_branch = Some(branch.clone());
                Some(())
            })
            .await?;
        Ok(match set {
            Some(()) => {
                info!(%project_id, %branch, "default branch recorded");
                PlatformResponse::Created
            }
            None => PlatformResponse::AlreadyExists,
        })
    }

    async fn protect_branch(
        &self,
        project_id: ProjectId,
        branch: String,
        developers_can_push: bool,
    ) -> Result<PlatformResponse, StoreError> {
        let created = self
            .mutate(|s| {
                let exists = s
                    .protected_branches
                    .iter()
                    .any(|p| p.project_id == project_id && p.name == branch);
                (!exists).then(|| {
                    s.protected_branches.push(ProtectedBranch {
                        project_id,
                        name: branch.clone(),
                        developers_can_push,
                    });
                })
            })
            .await?;
        Ok(match created {
            Some(()) => PlatformResponse::Created,
            None => PlatformResponse::AlreadyExists,
        })
    }

    async fn create_note(&self, note: CrossReferenceNote) -> Result<PlatformResponse, StoreError> {
        let created = self
            .mutate(|s| {
                let exists = s.notes.iter().any(|n| n.note.key() == note.key());
                (!exists).then(|| {
                    s.notes.push(StoredNote {
                        note: note.clone(),
                        created_at: Utc::now(),
                    });
                })
            })
            .await?;
        Ok(match created {
            Some(()) => PlatformResponse::Created,
            None => PlatformResponse::AlreadyExists,
        })
    }

    async fn close_issue(
        &self,
        project_id: ProjectId,
        iid: IssueIid,
        commit_id: Sha,
        closed_by: UserId,
    ) -> Result<PlatformResponse, StoreError> {
        {
            let snapshot = self.inner.snapshot.lock().await;
            let issue = snapshot
                .issues
                .iter()
                .find(|i| i.project_id == project_id && i.iid == iid)
                .ok_or(StoreError::UnknownIssue { project_id, iid })?;
            if issue.is_closed() {
                return Ok(PlatformResponse::AlreadyClosed);
            }
        }

        let closed = self
            .mutate(|s| {
                let issue = s
                    .issues
                    .iter_mut()
                    .find(|i| i.project_id == project_id && i.iid == iid && !i.is_closed())?;
                issue.state = IssueState::Closed;
                s.closures.push(IssueClosure {
                    project_id,
                    iid,
                    commit_id: commit_id.clone(),
                    closed_by,
                    closed_at: Utc::now(),
                });
                Some(())
            })
            .await?;
        Ok(match closed {
            Some(()) => PlatformResponse::Closed,
            None => PlatformResponse::AlreadyClosed,
        })
    }
}

impl PlatformInterpreter for LocalStore {
    type Error = StoreError;

    async fn interpret(&self, effect: PlatformEffect) -> Result<PlatformResponse, Self::Error> {
        match effect {
            PlatformEffect::AppendEvent { event } => self.append_event(event).await,

            PlatformEffect::DeliverWebhook {
                event,
                default_branch,
            } => {
                let delivered = self.inner.webhooks.deliver(&event, default_branch).await?;
                debug!(delivered, "webhooks delivered");
                Ok(PlatformResponse::Ok)
            }

            PlatformEffect::SetDefaultBranch { project_id, branch } => {
                self.set_default_branch(project_id, branch).await
            }

            PlatformEffect::ProtectBranch {
                project_id,
                branch,
                developers_can_push,
            } => {
                self.protect_branch(project_id, branch, developers_can_push)
                    .await
            }

            PlatformEffect::FindUserByEmail { email } => {
                let snapshot = self.inner.snapshot.lock().await;
                let user = snapshot
                    .users
                    .iter()
                    .find(|u| u.email.eq_ignore_ascii_case(&email))
                    .cloned();
                Ok(PlatformResponse::User(user))
            }

            PlatformEffect::FindIssue { project_id, iid } => {
                let snapshot = self.inner.snapshot.lock().await;
                let issue = snapshot
                    .issues
                    .iter()
                    .find(|i| i.project_id == project_id && i.iid == iid)
                    .cloned();
                Ok(PlatformResponse::Issue(issue))
            }

            PlatformEffect::CreateCrossReference { note } => self.create_note(note).await,

            PlatformEffect::CloseIssue {
                project_id,
                iid,
                commit_id,
                closed_by,
            } => self.close_issue(project_id, iid, commit_id, closed_by).await,
        }
    }
}
