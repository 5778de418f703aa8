//! Shared test fixtures, recording fakes and arbitrary generators.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::DateTime;
use proptest::prelude::*;
use thiserror::Error;

use crate::effects::{
    CrossReferenceNote, HistoryEffect, HistoryInterpreter, HistoryResponse, PlatformEffect,
    PlatformInterpreter, PlatformResponse, RemoteEffect, RemoteInterpreter, RemoteResponse,
};
use crate::payload::PushEvent;
use crate::types::{
    Commit, CommitAuthor, EventId, IssueId, IssueIid, IssueRecord, IssueState, Project, ProjectId,
    ProtectionLevel, Sha, User, UserId,
};

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn sample_project() -> Project {
    Project {
        id: ProjectId(15),
        name: "Gitlab Test".into(),
        path_with_namespace: "group/gitlab-test".into(),
        description: None,
        clone_url: "git@example.com:group/gitlab-test.git".into(),
        default_branch: Some("master".into()),
        branch_protection: ProtectionLevel::default(),
    }
}

pub fn sample_user() -> User {
    User {
        id: UserId(4),
        name: "John Smith".into(),
        username: "jsmith".into(),
        email: "john@example.com".into(),
    }
}

/// The local account matching [`sample_commit`]'s author email.
pub fn commit_author_user() -> User {
    User {
        id: UserId(7),
        name: "Jordi Mallach".into(),
        username: "jordi".into(),
        email: "jordi@example.com".into(),
    }
}

/// A commit whose id is `c` repeated 40 times.
pub fn sample_commit(c: char, message: &str) -> Commit {
    Commit {
        id: Sha::new(c.to_string().repeat(40)),
        message: message.to_string(),
        author: CommitAuthor {
            name: "Jordi Mallach".into(),
            email: "jordi@example.com".into(),
        },
        authored_at: DateTime::parse_from_rfc3339("2024-01-15T10:00:00+02:00").unwrap(),
    }
}

pub fn open_issue(id: u64, iid: u64) -> IssueRecord {
    IssueRecord {
        id: IssueId(id),
        iid: IssueIid(iid),
        project_id: sample_project().id,
        title: format!("Issue {iid}"),
        state: IssueState::Opened,
    }
}

#[derive(Debug, Clone, Error)]
#[error("injected failure: {0}")]
pub struct FakeError(pub String);

// ─── History ──────────────────────────────────────────────────────────────────

/// A scripted history store. Unscripted queries answer empty.
#[derive(Debug, Default)]
pub struct FakeHistory {
    ranges: HashMap<(Sha, Sha), Vec<Commit>>,
    ancestry: HashMap<String, Vec<Commit>>,
    head: Option<String>,
    failing: bool,
    queries: Mutex<Vec<HistoryEffect>>,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that fails every query.
    pub fn failing() -> Self {
        FakeHistory {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_range(mut self, from: Sha, to: Sha, commits: Vec<Commit>) -> Self {
        self.ranges.insert((from, to), commits);
        self
    }

    pub fn with_ancestry(mut self, rev: Sha, commits: Vec<Commit>) -> Self {
        self.ancestry.insert(rev.to_string(), commits);
        self
    }

    pub fn with_ancestry_of_ref(mut self, ref_name: &str, commits: Vec<Commit>) -> Self {
        self.ancestry.insert(ref_name.to_string(), commits);
        self
    }

    pub fn with_head(mut self, branch: &str) -> Self {
        self.head = Some(branch.to_string());
        self
    }

    pub fn queries(&self) -> Vec<HistoryEffect> {
        self.queries.lock().unwrap().clone()
    }
}

impl HistoryInterpreter for FakeHistory {
    type Error = FakeError;

    async fn interpret(&self, effect: HistoryEffect) -> Result<HistoryResponse, Self::Error> {
        self.queries.lock().unwrap().push(effect.clone());
        if self.failing {
            return Err(FakeError(format!("{effect:?}")));
        }
        Ok(match effect {
            HistoryEffect::CommitsBetween { from, to } => HistoryResponse::Commits(
                self.ranges.get(&(from, to)).cloned().unwrap_or_default(),
            ),
            HistoryEffect::CommitsFrom { rev } => {
                HistoryResponse::Commits(self.ancestry.get(&rev).cloned().unwrap_or_default())
            }
            HistoryEffect::HeadBranch => HistoryResponse::Branch(self.head.clone()),
        })
    }
}

// ─── Platform ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PlatformState {
    users: Vec<User>,
    issues: Vec<IssueRecord>,
    notes: Vec<CrossReferenceNote>,
    protected: Vec<(ProjectId, String, bool)>,
    default_branches: HashMap<ProjectId, String>,
    events: Vec<PushEvent>,
    deliveries: Vec<(PushEvent, bool)>,
    closed_by: Vec<(IssueIid, UserId)>,
    journal: Vec<PlatformEffect>,
    failing: HashSet<&'static str>,
}

/// An in-memory platform that records every effect it sees.
///
/// Clones share state, so a test can keep a handle while the pipeline owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<PlatformState>>,
}

/// Short name of a platform effect, as accepted by [`FakePlatform::failing_on`].
pub fn effect_kind(effect: &PlatformEffect) -> &'static str {
    match effect {
        PlatformEffect::AppendEvent { .. } => "append_event",
        PlatformEffect::DeliverWebhook { .. } => "deliver_webhook",
        PlatformEffect::SetDefaultBranch { .. } => "set_default_branch",
        PlatformEffect::ProtectBranch { .. } => "protect_branch",
        PlatformEffect::FindUserByEmail { .. } => "find_user_by_email",
        PlatformEffect::FindIssue { .. } => "find_issue",
        PlatformEffect::CreateCrossReference { .. } => "create_cross_reference",
        PlatformEffect::CloseIssue { .. } => "close_issue",
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    pub fn with_issue(self, issue: IssueRecord) -> Self {
        self.state.lock().unwrap().issues.push(issue);
        self
    }

    /// Makes every effect of the given kind fail.
    pub fn failing_on(self, kind: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(kind);
        self
    }

    pub fn notes(&self) -> Vec<CrossReferenceNote> {
        self.state.lock().unwrap().notes.clone()
    }

    pub fn protected(&self) -> Vec<(ProjectId, String, bool)> {
        self.state.lock().unwrap().protected.clone()
    }

    pub fn default_branch(&self, project_id: ProjectId) -> Option<String> {
        self.state.lock().unwrap().default_branches.get(&project_id).cloned()
    }

    pub fn events(&self) -> Vec<PushEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn deliveries(&self) -> Vec<(PushEvent, bool)> {
        self.state.lock().unwrap().deliveries.clone()
    }

    pub fn closed_by(&self) -> Vec<(IssueIid, UserId)> {
        self.state.lock().unwrap().closed_by.clone()
    }

    pub fn issue(&self, iid: IssueIid) -> Option<IssueRecord> {
        let state = self.state.lock().unwrap();
        state.issues.iter().find(|i| i.iid == iid).cloned()
    }

    /// Every platform effect seen, in order.
    pub fn journal(&self) -> Vec<PlatformEffect> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Kinds of every platform effect seen, in order.
    pub fn journal_kinds(&self) -> Vec<&'static str> {
        self.journal().iter().map(effect_kind).collect()
    }
}

impl PlatformInterpreter for FakePlatform {
    type Error = FakeError;

    async fn interpret(&self, effect: PlatformEffect) -> Result<PlatformResponse, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(effect.clone());
        if state.failing.contains(effect_kind(&effect)) {
            return Err(FakeError(effect_kind(&effect).to_string()));
        }

        Ok(match effect {
            PlatformEffect::AppendEvent { event } => {
                state.events.push(event);
                PlatformResponse::EventId(EventId(state.events.len() as u64))
            }
            PlatformEffect::DeliverWebhook {
                event,
                default_branch,
            } => {
                state.deliveries.push((event, default_branch));
                PlatformResponse::Ok
            }
            PlatformEffect::SetDefaultBranch { project_id, branch } => {
                if state.default_branches.contains_key(&project_id) {
                    PlatformResponse::AlreadyExists
                } else {
                    state.default_branches.insert(project_id, branch);
                    PlatformResponse::Created
                }
            }
            PlatformEffect::ProtectBranch {
                project_id,
                branch,
                developers_can_push,
            } => {
                if state
                    .protected
                    .iter()
                    .any(|(p, b, _)| *p == project_id && *b == branch)
                {
                    PlatformResponse::AlreadyExists
                } else {
                    state.protected.push((project_id, branch, developers_can_push));
                    PlatformResponse::Created
                }
            }
            PlatformEffect::FindUserByEmail { email } => PlatformResponse::User(
                state
                    .users
                    .iter()
                    .find(|u| u.email.eq_ignore_ascii_case(&email))
                    .cloned(),
            ),
            PlatformEffect::FindIssue { project_id, iid } => PlatformResponse::Issue(
                state
                    .issues
                    .iter()
                    .find(|i| i.project_id == project_id && i.iid == iid)
                    .cloned(),
            ),
            PlatformEffect::CreateCrossReference { note } => {
                if state.notes.iter().any(|n| n.key() == note.key()) {
                    PlatformResponse::AlreadyExists
                } else {
                    state.notes.push(note);
                    PlatformResponse::Created
                }
            }
            PlatformEffect::CloseIssue {
                project_id,
                iid,
                closed_by,
                ..
            } => {
                let Some(issue) = state
                    .issues
                    .iter_mut()
                    .find(|i| i.project_id == project_id && i.iid == iid)
                else {
                    return Err(FakeError(format!("no issue {iid}")));
                };
                if issue.is_closed() {
                    PlatformResponse::AlreadyClosed
                } else {
                    issue.state = IssueState::Closed;
                    state.closed_by.push((iid, closed_by));
                    PlatformResponse::Closed
                }
            }
        })
    }
}

// ─── Remote ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RemoteState {
    calls: Vec<RemoteEffect>,
    failing: bool,
}

/// A recording remote tracker. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote that records and then rejects every call.
    pub fn failing() -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().failing = true;
        remote
    }

    pub fn calls(&self) -> Vec<RemoteEffect> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn transitions(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteEffect::TransitionIssue {
                    issue_key,
                    transition_id,
                } => Some((issue_key, transition_id)),
                _ => None,
            })
            .collect()
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteEffect::PostComment { issue_key, body } => Some((issue_key, body)),
                _ => None,
            })
            .collect()
    }
}

impl RemoteInterpreter for FakeRemote {
    type Error = FakeError;

    async fn interpret(&self, effect: RemoteEffect) -> Result<RemoteResponse, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(effect.clone());
        if state.failing {
            return Err(FakeError(format!("{effect:?}")));
        }
        Ok(RemoteResponse::Ok)
    }
}
