//! History interpreter backed by the `git` CLI.
//!
//! Each `GitHistory` is scoped to one repository (typically a bare repository
//! on the hosting server). Commands run with system and user configuration
//! disabled so behaviour does not depend on the host's git setup.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::DateTime;
use thiserror::Error;
use tracing::trace;

use crate::effects::{HistoryEffect, HistoryInterpreter, HistoryResponse};
use crate::refs::BRANCH_PREFIX;
use crate::types::{Commit, CommitAuthor, Sha};

/// Field and record separators for `git log` output (ASCII US and RS).
const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// `--format` producing `id, author name, author email, author date, body`.
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%aI%x1f%B%x1e";

/// Errors from git history queries.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Git command failed.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Git printed something we could not parse.
    #[error("unparseable git output: {0}")]
    Parse(String),

    /// IO error (including failure to spawn git).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking git task panicked or was cancelled.
    #[error("git task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Create a git Command with clean environment (no system/user config).
fn git_command(git_dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("--git-dir").arg(git_dir);
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Run a git command synchronously, returning stdout on success.
fn run_git(git_dir: &Path, args: &[&str]) -> Result<String, HistoryError> {
    let output = git_command(git_dir).args(args).output()?;
    if !output.status.success() {
        return Err(HistoryError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parses `git log` output produced with [`LOG_FORMAT`].
fn parse_log(output: &str) -> Result<Vec<Commit>, HistoryError> {
    output
        .split(RECORD_SEP)
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<Commit, HistoryError> {
    let mut fields = record.splitn(5, FIELD_SEP);
    let (Some(id), Some(name), Some(email), Some(date), Some(message)) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(HistoryError::Parse(record.to_string()));
    };

    let id = Sha::parse(id).map_err(|e| HistoryError::Parse(e.to_string()))?;
    let authored_at = DateTime::parse_from_rfc3339(date)
        .map_err(|e| HistoryError::Parse(format!("author date {date:?}: {e}")))?;

    Ok(Commit {
        id,
        message: message.trim_end_matches('\n').to_string(),
        author: CommitAuthor {
            name: name.to_string(),
            email: email.to_string(),
        },
        authored_at,
    })
}

/// A history interpreter for one repository.
#[derive(Debug, Clone)]
pub struct GitHistory {
    git_dir: PathBuf,
}

impl GitHistory {
    /// Creates an interpreter for the repository at `git_dir` (a bare
    /// repository, or the `.git` directory of a working copy).
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        GitHistory {
            git_dir: git_dir.into(),
        }
    }

    fn execute(git_dir: &Path, effect: HistoryEffect) -> Result<HistoryResponse, HistoryError> {
        match effect {
            HistoryEffect::CommitsBetween { from, to } => {
                let range = format!("{from}..{to}");
                let output = run_git(
                    git_dir,
                    &["log", "--reverse", LOG_FORMAT, "--end-of-options", &range, "--"],
                )?;
                Ok(HistoryResponse::Commits(parse_log(&output)?))
            }
            HistoryEffect::CommitsFrom { rev } => {
                let output = run_git(
                    git_dir,
                    &["log", "--reverse", LOG_FORMAT, "--end-of-options", &rev, "--"],
                )?;
                Ok(HistoryResponse::Commits(parse_log(&output)?))
            }
            HistoryEffect::HeadBranch => {
                // `symbolic-ref --quiet` exits 1 when HEAD is detached.
                match run_git(git_dir, &["symbolic-ref", "--quiet", "HEAD"]) {
                    Ok(output) => {
                        let head = output.trim();
                        Ok(HistoryResponse::Branch(
                            head.strip_prefix(BRANCH_PREFIX).map(str::to_string),
                        ))
                    }
                    Err(HistoryError::CommandFailed { .. }) => Ok(HistoryResponse::Branch(None)),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

impl HistoryInterpreter for GitHistory {
    type Error = HistoryError;

    async fn interpret(&self, effect: HistoryEffect) -> Result<HistoryResponse, Self::Error> {
        trace!(?effect, git_dir = %self.git_dir.display(), "Executing history effect");
        let git_dir = self.git_dir.clone();
        tokio::task::spawn_blocking(move || Self::execute(&git_dir, effect)).await?
    }
}
