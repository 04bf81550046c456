//! Tracking comment state.
//!
//! One comment per job is the only user-visible channel. The job that
//! created it is the only writer.

use serde::{Deserialize, Serialize};

/// Which endpoint family owns the comment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentTarget {
    /// General issue / PR conversation comment
    Issue,
    /// Reply in a PR review-comment thread
    ReviewThread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentPhase {
    Created,
    Working,
    BranchLinked,
    Final,
}

/// The single mutable comment associated with a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingComment {
    pub id: u64,
    pub target: CommentTarget,
    pub current_body: String,
    pub phase: CommentPhase,
}

impl TrackingComment {
    pub fn new(id: u64, target: CommentTarget, body: impl Into<String>) -> Self {
        Self {
            id,
            target,
            current_body: body.into(),
            phase: CommentPhase::Created,
        }
    }
}
