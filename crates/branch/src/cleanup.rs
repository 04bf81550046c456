//! End-of-job classification of a created branch.
//!
//! Strategies are tried in order until one gives a definite answer. If none
//! does, the branch is reported as having changes so work is never hidden
//! from the user. Classification never deletes anything; an empty result
//! only means the branch link is omitted.

use std::sync::Arc;

use async_trait::async_trait;
use forgehand_core::{
    BranchStatus, ForgeApi, ForgeError, GitError, GitOps, ProviderProfile, RepoId,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Tri-state result of one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    HasChanges,
    Empty,
    Inconclusive,
}

/// The refs being compared.
#[derive(Debug, Clone, Copy)]
pub struct CheckTarget<'a> {
    pub repo: &'a RepoId,
    pub base: &'a str,
    pub branch: &'a str,
}

#[async_trait]
pub trait CleanupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, target: CheckTarget<'_>) -> Verdict;
}

// ── Compare API ─────────────────────────────────────────────────────────────

/// Asks the forge how far the branch is ahead of the base.
pub struct CompareApi {
    forge: Arc<dyn ForgeApi>,
}

impl CompareApi {
    pub fn new(forge: Arc<dyn ForgeApi>) -> Self {
        Self { forge }
    }
}

#[async_trait]
impl CleanupStrategy for CompareApi {
    fn name(&self) -> &'static str {
        "compare-api"
    }

    async fn check(&self, target: CheckTarget<'_>) -> Verdict {
        match self
            .forge
            .compare_commits(target.repo, target.base, target.branch)
            .await
        {
            Ok(c) if c.ahead_by > 0 || c.total_commits > 0 => Verdict::HasChanges,
            Ok(_) => Verdict::Empty,
            Err(e) => {
                debug!(error = %e, "Compare inconclusive");
                Verdict::Inconclusive
            }
        }
    }
}

// ── Branch tip SHA ──────────────────────────────────────────────────────────

/// Where branch tips are read from.
pub enum TipSource {
    /// `git ls-remote` against the remote
    Local { git: Arc<dyn GitOps>, remote: String },
    /// The forge's get-branch endpoint
    Rest(Arc<dyn ForgeApi>),
}

/// A tip lookup that failed, split by whether the ref is missing.
enum TipError {
    Missing,
    Other(String),
}

impl From<GitError> for TipError {
    fn from(e: GitError) -> Self {
        if e.is_not_found() {
            Self::Missing
        } else {
            Self::Other(e.to_string())
        }
    }
}

impl From<ForgeError> for TipError {
    fn from(e: ForgeError) -> Self {
        if e.is_not_found() {
            Self::Missing
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Compares the tip SHAs of base and branch. A missing branch was never
/// pushed and counts as empty.
pub struct BranchTipSha {
    source: TipSource,
}

impl BranchTipSha {
    pub fn new(source: TipSource) -> Self {
        Self { source }
    }

    async fn tip(&self, repo: &RepoId, branch: &str) -> Result<String, TipError> {
        match &self.source {
            TipSource::Local { git, remote } => Ok(git.remote_branch_sha(remote, branch).await?),
            TipSource::Rest(forge) => Ok(forge.get_branch(repo, branch).await?.sha),
        }
    }
}

#[async_trait]
impl CleanupStrategy for BranchTipSha {
    fn name(&self) -> &'static str {
        "branch-tip-sha"
    }

    async fn check(&self, target: CheckTarget<'_>) -> Verdict {
        let branch_sha = match self.tip(target.repo, target.branch).await {
            Ok(sha) => sha,
            Err(TipError::Missing) => {
                info!(branch = %target.branch, "Branch was never pushed, treating as empty");
                return Verdict::Empty;
            }
            Err(TipError::Other(e)) => {
                debug!(branch = %target.branch, error = %e, "Branch tip lookup failed");
                return Verdict::Inconclusive;
            }
        };

        let base_sha = match self.tip(target.repo, target.base).await {
            Ok(sha) => sha,
            Err(_) => {
                debug!(base = %target.base, "Base tip lookup failed");
                return Verdict::Inconclusive;
            }
        };

        if branch_sha == base_sha {
            Verdict::Empty
        } else {
            Verdict::HasChanges
        }
    }
}

// ── Classifier ──────────────────────────────────────────────────────────────

/// Ordered strategy list with a has-changes default.
pub struct BranchClassifier {
    strategies: Vec<Box<dyn CleanupStrategy>>,
}

impl BranchClassifier {
    pub fn new(strategies: Vec<Box<dyn CleanupStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard strategy list for `profile`: the compare API when the
    /// forge has one, then tip comparison from the preferred source.
    pub fn for_profile(
        profile: &ProviderProfile,
        forge: Arc<dyn ForgeApi>,
        git: Arc<dyn GitOps>,
        remote: &str,
    ) -> Self {
        let mut strategies: Vec<Box<dyn CleanupStrategy>> = Vec::new();
        if profile.supports_compare_api {
            strategies.push(Box::new(CompareApi::new(forge.clone())));
        }
        let source = if profile.prefers_local_refs() {
            TipSource::Local {
                git,
                remote: remote.to_string(),
            }
        } else {
            TipSource::Rest(forge)
        };
        strategies.push(Box::new(BranchTipSha::new(source)));
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn classify(&self, repo: &RepoId, base: &str, branch: &str) -> BranchStatus {
        let target = CheckTarget { repo, base, branch };

        for strategy in &self.strategies {
            match strategy.check(target).await {
                Verdict::HasChanges => {
                    debug!(strategy = strategy.name(), branch = %branch, "Branch has changes");
                    return BranchStatus::HasChanges;
                }
                Verdict::Empty => {
                    debug!(strategy = strategy.name(), branch = %branch, "Branch is empty");
                    return BranchStatus::Empty;
                }
                Verdict::Inconclusive => {
                    debug!(strategy = strategy.name(), "Strategy inconclusive, trying next");
                }
            }
        }

        warn!(
            branch = %branch,
            base = %base,
            "No cleanup strategy was conclusive, assuming the branch has changes"
        );
        BranchStatus::HasChanges
    }
}
