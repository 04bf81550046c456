//! Branch information produced by the branch lifecycle manager.

use serde::{Deserialize, Serialize};

/// Which branch the agent works on, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Branch the work is based on (PR base ref or source branch)
    pub base_branch: String,

    /// Present only when a new branch was created for this job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_branch: Option<String>,

    /// The branch that is checked out locally
    pub current_branch: String,
}

impl BranchInfo {
    /// Whether this job created its own branch.
    pub fn created_branch(&self) -> bool {
        self.claude_branch.is_some()
    }
}

/// Result of the end-of-job check on a created branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// The agent pushed commits beyond the base
    HasChanges,
    /// No agent commits, or the branch was never pushed
    Empty,
}

impl BranchStatus {
    /// Whether the branch link should be shown to the user.
    pub fn show_link(&self) -> bool {
        matches!(self, Self::HasChanges)
    }
}
