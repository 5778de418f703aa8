//! The canonical push-event payload.
//!
//! This is the one externally visible format the pipeline produces: it is
//! written to the event log and POSTed to webhook consumers. Field names,
//! nesting and key order are a compatibility surface and must not change.
//!
//! ```json
//! {
//!   "before": "95790bf891e76fee5e1747ab589903a6a1f80f22",
//!   "after": "da1560886d4f094c3e6c9ef40349f7d38b5d27d7",
//!   "ref": "refs/heads/master",
//!   "user_id": 4,
//!   "user_name": "John Smith",
//!   "project_id": 15,
//!   "repository": {
//!     "name": "Diaspora",
//!     "url": "git@example.com:mike/diaspora.git",
//!     "description": "",
//!     "homepage": "http://example.com/mike/diaspora"
//!   },
//!   "commits": [
//!     {
//!       "id": "b6568db1bc1dcd7f8b4d5a946b0b91f9dacd7327",
//!       "message": "Update Catalan translation to e38cb41.",
//!       "timestamp": "2011-12-12T14:27:31+02:00",
//!       "url": "http://example.com/mike/diaspora/commit/b6568db1bc1dcd7f8b4d5a946b0b91f9dacd7327",
//!       "author": { "name": "Jordi Mallach", "email": "jordi@softcatala.org" }
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Commit, CommitAuthor, Project, ProjectId, Sha, User, UserId};

/// Reasons a payload cannot be built. These are precondition violations
/// detected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// `before` and `after` are both the blank sentinel.
    #[error("before and after revisions are both blank")]
    BothRevisionsBlank,

    /// The project has no usable identity.
    #[error("project {0} is missing its name or path")]
    MissingProjectIdentity(ProjectId),

    /// The pushing user has no usable identity.
    #[error("user {0} is missing a name")]
    MissingUserIdentity(UserId),
}

/// Repository metadata snapshot embedded in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    /// Clone URL.
    pub url: String,
    /// Always present; empty when the project has no description.
    pub description: String,
    /// Project web URL.
    pub homepage: String,
}

/// One commit in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub id: Sha,
    pub message: String,
    /// RFC 3339 author date with the author's offset.
    pub timestamp: String,
    pub url: String,
    pub author: CommitAuthor,
}

impl CommitSummary {
    /// The first line of the message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// A push event. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    pub before: Sha,
    pub after: Sha,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub user_id: UserId,
    pub user_name: String,
    pub project_id: ProjectId,
    pub repository: RepositoryInfo,
    /// Oldest first.
    pub commits: Vec<CommitSummary>,
}

/// The web URL of a commit: `{base_url}/{project path}/commit/{id}`.
pub fn commit_url(base_url: &str, project: &Project, id: &Sha) -> String {
    format!("{}/commit/{}", project.web_url(base_url), id)
}

/// Converts a history commit into its payload form.
pub fn summarize_commit(base_url: &str, project: &Project, commit: &Commit) -> CommitSummary {
    CommitSummary {
        id: commit.id.clone(),
        message: commit.message.clone(),
        timestamp: commit.authored_at.to_rfc3339(),
        url: commit_url(base_url, project, &commit.id),
        author: commit.author.clone(),
    }
}

/// Checks the identity preconditions shared by every push.
pub fn validate_identity(project: &Project, user: &User) -> Result<(), PayloadError> {
    if project.name.trim().is_empty() || project.path_with_namespace.trim().is_empty() {
        return Err(PayloadError::MissingProjectIdentity(project.id));
    }
    if user.name.trim().is_empty() {
        return Err(PayloadError::MissingUserIdentity(user.id));
    }
    Ok(())
}

/// Everything needed to assemble a [`PushEvent`].
#[derive(Debug, Clone, Copy)]
pub struct PayloadInput<'a> {
    pub base_url: &'a str,
    pub project: &'a Project,
    pub user: &'a User,
    pub before: &'a Sha,
    pub after: &'a Sha,
    pub ref_name: &'a str,
    /// Oldest first; order is preserved.
    pub commits: &'a [Commit],
}

/// Assembles the push payload. Pure: no I/O.
pub fn build_push_event(input: PayloadInput<'_>) -> Result<PushEvent, PayloadError> {
    if input.before.is_blank() && input.after.is_blank() {
        return Err(PayloadError::BothRevisionsBlank);
    }
    validate_identity(input.project, input.user)?;

    let project = input.project;
    Ok(PushEvent {
        before: input.before.clone(),
        after: input.after.clone(),
        ref_name: input.ref_name.to_string(),
        user_id: input.user.id,
        user_name: input.user.name.clone(),
        project_id: project.id,
        repository: RepositoryInfo {
            name: project.name.clone(),
            url: project.clone_url.clone(),
            description: project.description.clone().unwrap_or_default(),
            homepage: project.web_url(input.base_url),
        },
        commits: input
            .commits
            .iter()
            .map(|commit| summarize_commit(input.base_url, project, commit))
            .collect(),
    })
}
