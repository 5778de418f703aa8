//! Core domain types for the push pipeline.
//!
//! This module contains the identifiers and records shared by every stage,
//! designed to encode invariants via the type system.

pub mod commit;
pub mod ids;
pub mod issue;
pub mod project;

// Re-export commonly used types at the module level
pub use commit::{Commit, CommitAuthor};
pub use ids::{EventId, InvalidSha, IssueId, IssueIid, ProjectId, Sha, UserId};
pub use issue::{IssueRecord, IssueState};
pub use project::{Project, ProtectionLevel, User};
