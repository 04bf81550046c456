//! Forge API trait: the capability-typed view of the hosting platform.
//!
//! Two implementations exist (full and reduced capability); which one is
//! in play is decided once from the [`ProviderProfile`](crate::ProviderProfile).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comment::CommentTarget;
use crate::error::ForgeError;
use crate::event::RepoId;
use crate::profile::ProviderProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueData {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestData {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    pub state: String,
    pub merged: bool,
    pub head_ref: String,
    pub base_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentData {
    pub id: u64,
    pub author: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
    pub sha: String,
}

/// Commit distance between two refs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub ahead_by: u64,
    pub total_commits: u64,
}

/// What the forge says an account is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Human,
    Bot,
}

/// Repository permission level of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    None,
}

impl Permission {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" | "owner" => Self::Admin,
            "maintain" => Self::Maintain,
            "write" => Self::Write,
            "triage" => Self::Triage,
            "read" => Self::Read,
            _ => Self::None,
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Self::Admin | Self::Maintain | Self::Write)
    }
}

/// The forge operations the orchestrator consumes.
#[async_trait]
pub trait ForgeApi: Send + Sync {
    /// The capability profile this client was built for.
    fn profile(&self) -> &ProviderProfile;

    async fn get_repository(&self, repo: &RepoId) -> Result<RepositoryInfo, ForgeError>;

    async fn get_issue(&self, repo: &RepoId, number: u64) -> Result<IssueData, ForgeError>;

    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<PullRequestData, ForgeError>;

    async fn list_comments(&self, repo: &RepoId, number: u64)
    -> Result<Vec<CommentData>, ForgeError>;

    async fn create_issue_comment(
        &self,
        repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<CommentData, ForgeError>;

    /// Reply inside a review-comment thread.
    async fn create_review_reply(
        &self,
        repo: &RepoId,
        pr_number: u64,
        in_reply_to: u64,
        body: &str,
    ) -> Result<CommentData, ForgeError>;

    async fn get_comment(
        &self,
        repo: &RepoId,
        id: u64,
        target: CommentTarget,
    ) -> Result<CommentData, ForgeError>;

    /// Replace the full body of a comment.
    async fn update_comment(
        &self,
        repo: &RepoId,
        id: u64,
        target: CommentTarget,
        body: &str,
    ) -> Result<CommentData, ForgeError>;

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<BranchRef, ForgeError>;

    /// Compare `base...head`. Capability-gated.
    async fn compare_commits(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ForgeError>;

    async fn get_actor_kind(&self, login: &str) -> Result<ActorKind, ForgeError>;

    async fn get_permission(&self, repo: &RepoId, login: &str) -> Result<Permission, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_parsing() {
        assert!(Permission::parse("admin").can_write());
        assert!(Permission::parse("Write").can_write());
        assert!(Permission::parse("maintain").can_write());
        assert!(!Permission::parse("read").can_write());
        assert!(!Permission::parse("triage").can_write());
        assert_eq!(Permission::parse("weird"), Permission::None);
    }
}
