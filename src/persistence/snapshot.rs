//! The local store's on-disk snapshot.
//!
//! A single JSON document holding every record the store owns. It is
//! rewritten in full, atomically, after each mutation (see
//! [`write_atomic`](super::fsync::write_atomic)). Projects and users are
//! provisioned by editing this file while the service is stopped. A project
//! provisioned without a default branch gets one on its first branch push.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fsync::write_atomic;
use crate::effects::CrossReferenceNote;
use crate::types::{IssueIid, IssueRecord, Project, ProjectId, Sha, User, UserId};

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// A protected-branch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedBranch {
    pub project_id: ProjectId,
    pub name: String,
    pub developers_can_push: bool,
}

/// A cross-reference note as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNote {
    #[serde(flatten)]
    pub note: CrossReferenceNote,
    pub created_at: DateTime<Utc>,
}

/// Who closed an issue, and with which commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueClosure {
    pub project_id: ProjectId,
    pub iid: IssueIid,
    pub commit_id: Sha,
    pub closed_by: UserId,
    pub closed_at: DateTime<Utc>,
}

/// Everything the local store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
    #[serde(default)]
    pub notes: Vec<StoredNote>,
    #[serde(default)]
    pub protected_branches: Vec<ProtectedBranch>,
    #[serde(default)]
    pub closures: Vec<IssueClosure>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        StoreSnapshot {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            projects: Vec::new(),
            users: Vec::new(),
            issues: Vec::new(),
            notes: Vec::new(),
            protected_branches: Vec::new(),
            closures: Vec::new(),
        }
    }
}

/// Writes the snapshot atomically, stamping `saved_at`.
pub fn save_snapshot(path: &Path, snapshot: &mut StoreSnapshot) -> Result<()> {
    snapshot.saved_at = Utc::now();
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Loads a snapshot, checking its schema version.
pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let bytes = std::fs::read(path)?;
    let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
    if snapshot.schema_version != SCHEMA_VERSION {
        return Err(SnapshotError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            got: snapshot.schema_version,
        });
    }
    Ok(snapshot)
}

/// Like [`load_snapshot`], but a missing file is `None`.
pub fn try_load_snapshot(path: &Path) -> Result<Option<StoreSnapshot>> {
    match load_snapshot(path) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(SnapshotError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
