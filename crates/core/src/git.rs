//! Local version-control operations.
//!
//! The branch lifecycle manager talks to git only through this trait, so
//! tests can swap in a recording fake.

use async_trait::async_trait;

use crate::error::GitError;

/// The git operations the orchestrator itself performs.
#[async_trait]
pub trait GitOps: Send + Sync {
    /// `git fetch <remote> <refspec>`, optionally shallow.
    async fn fetch(&self, remote: &str, refspec: &str, depth: Option<u32>) -> Result<(), GitError>;

    /// `git checkout <branch>`.
    async fn checkout(&self, branch: &str) -> Result<(), GitError>;

    /// `git pull <remote> <branch>`.
    async fn pull(&self, remote: &str, branch: &str) -> Result<(), GitError>;

    /// `git checkout -b <branch>`: create from HEAD and switch to it.
    async fn create_branch(&self, branch: &str) -> Result<(), GitError>;

    /// Name of the branch currently checked out.
    async fn current_branch(&self) -> Result<String, GitError>;

    /// Tip SHA of `branch` on `remote`. `GitError::NotFound` when absent.
    async fn remote_branch_sha(&self, remote: &str, branch: &str) -> Result<String, GitError>;
}
