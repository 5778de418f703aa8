//! Issues held by the internal tracker.

use serde::{Deserialize, Serialize};

use super::ids::{IssueId, IssueIid, ProjectId};

/// Issue state on the internal tracker. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Opened,
    Closed,
}

/// An issue on the internal tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: IssueId,
    pub iid: IssueIid,
    pub project_id: ProjectId,
    pub title: String,
    pub state: IssueState,
}

impl IssueRecord {
    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }
}
