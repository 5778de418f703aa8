//! Repository history effect types.
//!
//! These types describe history queries as data, without executing them.
//! Interpreters are repository-scoped: the interpreter is constructed with the
//! repository it reads, so effects don't name it.

use serde::{Deserialize, Serialize};

use crate::types::{Commit, Sha};

/// A history query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEffect {
    /// Commits reachable from `to` but not from `from`, oldest first.
    ///
    /// A blank `from` is passed through as-is; stores that cannot resolve it
    /// may answer with an error or an empty list.
    CommitsBetween { from: Sha, to: Sha },

    /// Every commit reachable from `rev` (a SHA or a ref name), oldest first.
    CommitsFrom { rev: String },

    /// The branch the repository's HEAD points at, if any.
    HeadBranch,
}

/// Response from a history effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HistoryResponse {
    /// Response to `CommitsBetween` and `CommitsFrom`.
    Commits(Vec<Commit>),
    /// Response to `HeadBranch`.
    Branch(Option<String>),
}
