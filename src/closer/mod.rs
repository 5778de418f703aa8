//! Closing issues named by closing keywords.
//!
//! Closing only takes effect when the push creates or updates the project's
//! default branch. On any other branch a closing reference does nothing: no
//! state change and no note.

use tracing::{debug, warn};

use crate::refs::RefChange;
use crate::scanner::IssueReference;
use crate::trackers::{CloseOutcome, IssueTracker, ReferenceContext};

/// Closes the referenced issue if the push lands on the default branch.
///
/// Returns `None` when the push is not eligible or the tracker failed (the
/// failure is logged).
pub async fn close_reference<T: IssueTracker>(
    tracker: &T,
    change: &RefChange,
    ctx: &ReferenceContext<'_>,
    reference: &IssueReference,
) -> Option<CloseOutcome> {
    debug_assert!(reference.is_closing);
    if !change.updates_default_branch() {
        debug!(issue = %reference.issue, "not the default branch, leaving issue open");
        return None;
    }
    match tracker.close(ctx, &reference.issue).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(
                issue = %reference.issue,
                commit = %ctx.commit.id.short(),
                error = %e,
                "closing issue failed"
            );
            None
        }
    }
}
