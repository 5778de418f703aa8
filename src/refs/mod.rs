//! Classification of ref updates.
//!
//! A push notification names a ref and its old and new revisions. This module
//! turns that triple into a [`RefChange`]: what happened to the ref, and
//! whether it is the project's default branch. Everything downstream (commit
//! enumeration, webhooks, branch protection, issue closing) branches on it.

use serde::{Deserialize, Serialize};

use crate::types::Sha;

/// Prefix shared by every branch ref.
pub const BRANCH_PREFIX: &str = "refs/heads/";

/// What a push did to a ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// A branch that did not exist was pushed.
    BranchCreated,
    /// A branch was deleted.
    BranchRemoved,
    /// An existing branch moved.
    BranchUpdated,
    /// Anything outside `refs/heads/`, such as a tag.
    NonBranchRef,
}

/// The classified ref update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefChange {
    pub kind: RefKind,
    /// True when the branch is (or, on first push, becomes) the project's
    /// default branch. Always false for non-branch refs.
    pub is_default_branch: bool,
}

impl RefChange {
    /// Returns true for the three branch kinds.
    pub fn is_branch(&self) -> bool {
        self.kind != RefKind::NonBranchRef
    }

    /// Returns true when commits landed on the default branch, which is the
    /// only situation in which closing keywords take effect.
    pub fn updates_default_branch(&self) -> bool {
        self.is_default_branch
            && matches!(self.kind, RefKind::BranchCreated | RefKind::BranchUpdated)
    }
}

/// Returns the branch name of a `refs/heads/...` ref, or `None` for any other
/// ref.
///
/// # Examples
///
/// ```
/// use push_hooks::refs::branch_name;
///
/// assert_eq!(branch_name("refs/heads/feature/x"), Some("feature/x"));
/// assert_eq!(branch_name("refs/tags/v1.0.0"), None);
/// assert_eq!(branch_name("refs/heads/"), None);
/// ```
pub fn branch_name(ref_name: &str) -> Option<&str> {
    ref_name
        .strip_prefix(BRANCH_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Classifies a ref update.
///
/// `default_branch` is the project's configured default branch, or `None` for
/// an empty repository. In the latter case the branch being created becomes
/// the effective default.
///
/// Both revisions blank is a malformed notification; callers reject it before
/// classifying (see [`crate::pipeline`]). If it does reach here it classifies
/// as a creation.
pub fn classify(
    old_rev: &Sha,
    new_rev: &Sha,
    ref_name: &str,
    default_branch: Option<&str>,
) -> RefChange {
    let Some(branch) = branch_name(ref_name) else {
        return RefChange {
            kind: RefKind::NonBranchRef,
            is_default_branch: false,
        };
    };

    let kind = if old_rev.is_blank() {
        RefKind::BranchCreated
    } else if new_rev.is_blank() {
        RefKind::BranchRemoved
    } else {
        RefKind::BranchUpdated
    };

    let is_default_branch = match default_branch {
        Some(default) => default == branch,
        None => kind == RefKind::BranchCreated,
    };

    RefChange {
        kind,
        is_default_branch,
    }
}
