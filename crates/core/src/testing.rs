//! In-memory collaborator fakes for tests.
//!
//! Enabled with the `testing` feature. Every fake records the calls it
//! receives so tests can assert on what was (and was not) invoked.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::comment::CommentTarget;
use crate::error::{Error, ForgeError, GitError, Result};
use crate::event::RepoId;
use crate::executor::{AgentExecutor, AgentRequest, ExecutionOutcome};
use crate::forge::{
    ActorKind, BranchRef, CommentData, Comparison, ForgeApi, IssueData, Permission,
    PullRequestData, RepositoryInfo,
};
use crate::git::GitOps;
use crate::profile::ProviderProfile;

// ── Forge ───────────────────────────────────────────────────────────────────

/// A scripted forge. Unsupported operations follow the profile.
pub struct FakeForge {
    profile: ProviderProfile,
    default_branch: String,
    issues: HashMap<u64, IssueData>,
    pulls: HashMap<u64, PullRequestData>,
    branches: HashMap<String, String>,
    comparison: Option<std::result::Result<Comparison, ForgeError>>,
    actors: HashMap<String, ActorKind>,
    permissions: HashMap<String, std::result::Result<Permission, ForgeError>>,
    failing: HashSet<String>,
    comments: Mutex<Vec<(CommentTarget, CommentData)>>,
    next_comment_id: Mutex<u64>,
    calls: Mutex<Vec<String>>,
}

impl FakeForge {
    pub fn new(profile: ProviderProfile) -> Self {
        Self {
            profile,
            default_branch: "main".into(),
            issues: HashMap::new(),
            pulls: HashMap::new(),
            branches: HashMap::new(),
            comparison: None,
            actors: HashMap::new(),
            permissions: HashMap::new(),
            failing: HashSet::new(),
            comments: Mutex::new(Vec::new()),
            next_comment_id: Mutex::new(1000),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_issue(mut self, issue: IssueData) -> Self {
        self.issues.insert(issue.number, issue);
        self
    }

    pub fn with_pull(mut self, pull: PullRequestData) -> Self {
        self.pulls.insert(pull.number, pull);
        self
    }

    pub fn with_branch(mut self, name: &str, sha: &str) -> Self {
        self.branches.insert(name.into(), sha.into());
        self
    }

    pub fn with_comparison(mut self, result: std::result::Result<Comparison, ForgeError>) -> Self {
        self.comparison = Some(result);
        self
    }

    pub fn with_actor(mut self, login: &str, kind: ActorKind) -> Self {
        self.actors.insert(login.into(), kind);
        self
    }

    pub fn with_permission(
        mut self,
        login: &str,
        result: std::result::Result<Permission, ForgeError>,
    ) -> Self {
        self.permissions.insert(login.into(), result);
        self
    }

    /// Make every call to `operation` fail with an API error.
    pub fn failing(mut self, operation: &str) -> Self {
        self.failing.insert(operation.into());
        self
    }

    /// Operation names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// All comments ever written, with their endpoint family.
    pub fn comments(&self) -> Vec<(CommentTarget, CommentData)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn comment_body(&self, id: u64) -> Option<String> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .find(|(_, c)| c.id == id)
            .map(|(_, c)| c.body.clone())
    }

    fn record(&self, operation: &str) -> std::result::Result<(), ForgeError> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.failing.contains(operation) {
            return Err(ForgeError::Api {
                status_code: 500,
                message: format!("{operation} failed"),
            });
        }
        Ok(())
    }

    fn insert_comment(&self, target: CommentTarget, author: &str, body: &str) -> CommentData {
        let mut next = self.next_comment_id.lock().unwrap();
        *next += 1;
        let comment = CommentData {
            id: *next,
            author: author.into(),
            body: body.into(),
            created_at: None,
        };
        self.comments.lock().unwrap().push((target, comment.clone()));
        comment
    }

    fn find_comment(&self, id: u64, target: CommentTarget) -> std::result::Result<usize, ForgeError> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .position(|(t, c)| c.id == id && *t == target)
            .ok_or_else(|| ForgeError::NotFound {
                resource: format!("comment {id}"),
            })
    }
}

#[async_trait]
impl ForgeApi for FakeForge {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn get_repository(&self, repo: &RepoId) -> std::result::Result<RepositoryInfo, ForgeError> {
        self.record("get_repository")?;
        Ok(RepositoryInfo {
            full_name: repo.full_name(),
            default_branch: self.default_branch.clone(),
        })
    }

    async fn get_issue(&self, _repo: &RepoId, number: u64) -> std::result::Result<IssueData, ForgeError> {
        self.record("get_issue")?;
        self.issues.get(&number).cloned().ok_or_else(|| ForgeError::NotFound {
            resource: format!("issue {number}"),
        })
    }

    async fn get_pull_request(
        &self,
        _repo: &RepoId,
        number: u64,
    ) -> std::result::Result<PullRequestData, ForgeError> {
        self.record("get_pull_request")?;
        self.pulls.get(&number).cloned().ok_or_else(|| ForgeError::NotFound {
            resource: format!("pull {number}"),
        })
    }

    async fn list_comments(
        &self,
        _repo: &RepoId,
        _number: u64,
    ) -> std::result::Result<Vec<CommentData>, ForgeError> {
        self.record("list_comments")?;
        Ok(self.comments.lock().unwrap().iter().map(|(_, c)| c.clone()).collect())
    }

    async fn create_issue_comment(
        &self,
        _repo: &RepoId,
        _number: u64,
        body: &str,
    ) -> std::result::Result<CommentData, ForgeError> {
        self.record("create_issue_comment")?;
        Ok(self.insert_comment(CommentTarget::Issue, "forgehand[bot]", body))
    }

    async fn create_review_reply(
        &self,
        _repo: &RepoId,
        _pr_number: u64,
        _in_reply_to: u64,
        body: &str,
    ) -> std::result::Result<CommentData, ForgeError> {
        self.record("create_review_reply")?;
        if self.profile.is_reduced() {
            return Err(ForgeError::unsupported("review-thread replies"));
        }
        Ok(self.insert_comment(CommentTarget::ReviewThread, "forgehand[bot]", body))
    }

    async fn get_comment(
        &self,
        _repo: &RepoId,
        id: u64,
        target: CommentTarget,
    ) -> std::result::Result<CommentData, ForgeError> {
        self.record("get_comment")?;
        let idx = self.find_comment(id, target)?;
        Ok(self.comments.lock().unwrap()[idx].1.clone())
    }

    async fn update_comment(
        &self,
        _repo: &RepoId,
        id: u64,
        target: CommentTarget,
        body: &str,
    ) -> std::result::Result<CommentData, ForgeError> {
        self.record("update_comment")?;
        let idx = self.find_comment(id, target)?;
        let mut comments = self.comments.lock().unwrap();
        comments[idx].1.body = body.to_string();
        Ok(comments[idx].1.clone())
    }

    async fn get_branch(&self, _repo: &RepoId, branch: &str) -> std::result::Result<BranchRef, ForgeError> {
        self.record("get_branch")?;
        self.branches
            .get(branch)
            .map(|sha| BranchRef {
                name: branch.to_string(),
                sha: sha.clone(),
            })
            .ok_or_else(|| ForgeError::NotFound {
                resource: format!("branch {branch}"),
            })
    }

    async fn compare_commits(
        &self,
        _repo: &RepoId,
        _base: &str,
        _head: &str,
    ) -> std::result::Result<Comparison, ForgeError> {
        self.record("compare_commits")?;
        if !self.profile.supports_compare_api {
            return Err(ForgeError::unsupported("compare"));
        }
        self.comparison
            .clone()
            .unwrap_or_else(|| Err(ForgeError::Network("no comparison scripted".into())))
    }

    async fn get_actor_kind(&self, login: &str) -> std::result::Result<ActorKind, ForgeError> {
        self.record("get_actor_kind")?;
        if self.profile.is_reduced() {
            return Err(ForgeError::unsupported("actor classification"));
        }
        Ok(self.actors.get(login).copied().unwrap_or(ActorKind::Human))
    }

    async fn get_permission(
        &self,
        _repo: &RepoId,
        login: &str,
    ) -> std::result::Result<Permission, ForgeError> {
        self.record("get_permission")?;
        self.permissions
            .get(login)
            .cloned()
            .unwrap_or(Ok(Permission::Write))
    }
}

// ── Git ─────────────────────────────────────────────────────────────────────

/// A recording git fake with a notion of the checked-out branch.
pub struct FakeGit {
    current: Mutex<String>,
    remote_shas: HashMap<String, String>,
    failing: HashSet<String>,
    commands: Mutex<Vec<String>>,
}

impl FakeGit {
    pub fn new(initial_branch: &str) -> Self {
        Self {
            current: Mutex::new(initial_branch.into()),
            remote_shas: HashMap::new(),
            failing: HashSet::new(),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn with_remote_branch(mut self, branch: &str, sha: &str) -> Self {
        self.remote_shas.insert(branch.into(), sha.into());
        self
    }

    /// Make `operation` (e.g. `create_branch`) fail.
    pub fn failing(mut self, operation: &str) -> Self {
        self.failing.insert(operation.into());
        self
    }

    /// Rendered git command lines in call order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, line: String) -> std::result::Result<(), GitError> {
        self.commands.lock().unwrap().push(line.clone());
        if self.failing.contains(operation) {
            return Err(GitError::CommandFailed {
                args: line,
                code: 128,
                stderr: format!("fatal: {operation} failed"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GitOps for FakeGit {
    async fn fetch(&self, remote: &str, refspec: &str, depth: Option<u32>) -> std::result::Result<(), GitError> {
        let line = match depth {
            Some(d) => format!("fetch {remote} --depth={d} {refspec}"),
            None => format!("fetch {remote} {refspec}"),
        };
        self.record("fetch", line)
    }

    async fn checkout(&self, branch: &str) -> std::result::Result<(), GitError> {
        self.record("checkout", format!("checkout {branch}"))?;
        *self.current.lock().unwrap() = branch.to_string();
        Ok(())
    }

    async fn pull(&self, remote: &str, branch: &str) -> std::result::Result<(), GitError> {
        self.record("pull", format!("pull {remote} {branch}"))
    }

    async fn create_branch(&self, branch: &str) -> std::result::Result<(), GitError> {
        self.record("create_branch", format!("checkout -b {branch}"))?;
        *self.current.lock().unwrap() = branch.to_string();
        Ok(())
    }

    async fn current_branch(&self) -> std::result::Result<String, GitError> {
        self.record("current_branch", "symbolic-ref --short HEAD".into())?;
        Ok(self.current.lock().unwrap().clone())
    }

    async fn remote_branch_sha(&self, remote: &str, branch: &str) -> std::result::Result<String, GitError> {
        self.record(
            "remote_branch_sha",
            format!("ls-remote --heads {remote} {branch}"),
        )?;
        self.remote_shas
            .get(branch)
            .cloned()
            .ok_or_else(|| GitError::NotFound {
                reference: format!("{remote}/{branch}"),
            })
    }
}

// ── Agent ───────────────────────────────────────────────────────────────────

/// An agent that returns a fixed outcome and keeps the last request.
pub struct ScriptedAgent {
    outcome: std::result::Result<ExecutionOutcome, String>,
    last_request: Mutex<Option<AgentRequest>>,
}

impl ScriptedAgent {
    pub fn succeeding(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            last_request: Mutex::new(None),
        }
    }

    /// An agent whose executor itself errors.
    pub fn erroring(message: &str) -> Self {
        Self {
            outcome: Err(message.into()),
            last_request: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<AgentRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentExecutor for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, request: AgentRequest) -> Result<ExecutionOutcome> {
        *self.last_request.lock().unwrap() = Some(request);
        self.outcome.clone().map_err(Error::ExternalAgent)
    }
}
