//! Working-branch setup.
//!
//! An open PR is worked on in place. Issues and closed or merged PRs get a
//! fresh branch cut locally from the source branch; the forge's
//! branch-creation endpoint is never used. Any git failure here is fatal:
//! nothing downstream can run without a checked-out branch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use forgehand_config::BranchConfig;
use forgehand_core::{BranchInfo, EntityKind, Error, GitOps, PrState, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::naming::branch_name;

/// PR fields that decide the branch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrBranchState {
    pub state: PrState,
    pub head_ref: String,
    pub base_ref: String,
}

/// What the manager needs to know about the entity.
#[derive(Debug, Clone)]
pub struct BranchRequest {
    pub entity_kind: EntityKind,
    pub entity_number: u64,
    /// Present for PR entities
    pub pr: Option<PrBranchState>,
    /// The repository's default branch
    pub default_branch: String,
}

/// The resolved path, before any git command runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum BranchPlan {
    /// Open PR: check out its head, base is the PR's base ref
    CheckoutPr { head: String, base: String },
    /// Issue or closed PR: cut `name` from `source`
    CreateBranch { source: String, name: String },
}

pub struct BranchManager {
    git: Arc<dyn GitOps>,
    config: BranchConfig,
}

impl BranchManager {
    pub fn new(git: Arc<dyn GitOps>, config: BranchConfig) -> Self {
        Self { git, config }
    }

    /// Decide the branch path. No side effects.
    pub fn plan(&self, request: &BranchRequest, now: DateTime<Utc>) -> BranchPlan {
        if let Some(pr) = request.pr.as_ref().filter(|pr| pr.state == PrState::Open) {
            return BranchPlan::CheckoutPr {
                head: pr.head_ref.clone(),
                base: pr.base_ref.clone(),
            };
        }

        let source = self
            .config
            .base_branch
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(&request.default_branch)
            .to_string();

        BranchPlan::CreateBranch {
            source,
            name: branch_name(
                &self.config.branch_prefix,
                request.entity_kind,
                request.entity_number,
                now,
            ),
        }
    }

    /// Plan, execute, and verify the checkout.
    pub async fn setup(&self, request: &BranchRequest, now: DateTime<Utc>) -> Result<BranchInfo> {
        let plan = self.plan(request, now);
        debug!(?plan, "Branch plan");

        let info = match plan {
            BranchPlan::CheckoutPr { head, base } => {
                self.checkout_pr(&head).await?;
                BranchInfo {
                    base_branch: base,
                    claude_branch: None,
                    current_branch: head,
                }
            }
            BranchPlan::CreateBranch { source, name } => {
                self.create_from(&source, &name).await?;
                BranchInfo {
                    base_branch: source,
                    claude_branch: Some(name.clone()),
                    current_branch: name,
                }
            }
        };

        self.verify(&info.current_branch).await?;
        info!(
            base = %info.base_branch,
            current = %info.current_branch,
            created = info.created_branch(),
            "Working branch ready"
        );
        Ok(info)
    }

    async fn checkout_pr(&self, head: &str) -> Result<()> {
        let remote = &self.config.remote;
        info!(branch = %head, depth = self.config.fetch_depth, "Checking out open PR branch");
        self.git
            .fetch(remote, head, Some(self.config.fetch_depth))
            .await
            .map_err(|e| Error::branch("fetch", e))?;
        self.git
            .checkout(head)
            .await
            .map_err(|e| Error::branch("checkout", e))
    }

    async fn create_from(&self, source: &str, name: &str) -> Result<()> {
        let remote = &self.config.remote;
        info!(source = %source, branch = %name, "Creating job branch");
        self.git
            .fetch(remote, source, None)
            .await
            .map_err(|e| Error::branch("fetch", e))?;
        self.git
            .checkout(source)
            .await
            .map_err(|e| Error::branch("checkout", e))?;
        self.git
            .pull(remote, source)
            .await
            .map_err(|e| Error::branch("pull", e))?;
        self.git
            .create_branch(name)
            .await
            .map_err(|e| Error::branch("create", e))
    }

    async fn verify(&self, expected: &str) -> Result<()> {
        let actual = self
            .git
            .current_branch()
            .await
            .map_err(|e| Error::branch("verify", e))?;
        if actual != expected {
            return Err(Error::branch(
                "verify",
                format!("expected '{expected}' to be checked out, found '{actual}'"),
            ));
        }
        Ok(())
    }
}
