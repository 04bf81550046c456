//! Full-capability forge client (GitHub REST v3).

use async_trait::async_trait;
use forgehand_core::{
    ActorKind, BranchRef, CommentData, CommentTarget, Comparison, ForgeApi, ForgeError,
    IssueData, Permission, ProviderProfile, PullRequestData, RepoId, RepositoryInfo,
};
use serde_json::json;

use crate::paths;
use crate::transport::{AuthScheme, RestTransport};
use crate::wire;

pub struct GithubClient {
    transport: RestTransport,
    profile: ProviderProfile,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, ForgeError> {
        Ok(Self {
            transport: RestTransport::new(api_url, token, AuthScheme::Bearer)?,
            profile: ProviderProfile::full(),
        })
    }

    fn comment_path(repo: &RepoId, id: u64, target: CommentTarget) -> String {
        match target {
            CommentTarget::Issue => paths::issue_comment(repo, id),
            CommentTarget::ReviewThread => paths::review_comment(repo, id),
        }
    }
}

#[async_trait]
impl ForgeApi for GithubClient {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn get_repository(&self, repo: &RepoId) -> Result<RepositoryInfo, ForgeError> {
        wire::repository(&self.transport.get(&paths::repo(repo)).await?)
    }

    async fn get_issue(&self, repo: &RepoId, number: u64) -> Result<IssueData, ForgeError> {
        wire::issue(&self.transport.get(&paths::issue(repo, number)).await?)
    }

    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<PullRequestData, ForgeError> {
        wire::pull_request(&self.transport.get(&paths::pull(repo, number)).await?)
    }

    async fn list_comments(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<CommentData>, ForgeError> {
        let path = format!("{}?per_page=100", paths::issue_comments(repo, number));
        wire::comments(&self.transport.get(&path).await?)
    }

    async fn create_issue_comment(
        &self,
        repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<CommentData, ForgeError> {
        let value = self
            .transport
            .post(&paths::issue_comments(repo, number), json!({ "body": body }))
            .await?;
        wire::comment(&value)
    }

    async fn create_review_reply(
        &self,
        repo: &RepoId,
        pr_number: u64,
        in_reply_to: u64,
        body: &str,
    ) -> Result<CommentData, ForgeError> {
        let value = self
            .transport
            .post(
                &paths::review_reply(repo, pr_number, in_reply_to),
                json!({ "body": body }),
            )
            .await?;
        wire::comment(&value)
    }

    async fn get_comment(
        &self,
        repo: &RepoId,
        id: u64,
        target: CommentTarget,
    ) -> Result<CommentData, ForgeError> {
        wire::comment(&self.transport.get(&Self::comment_path(repo, id, target)).await?)
    }

    async fn update_comment(
        &self,
        repo: &RepoId,
        id: u64,
        target: CommentTarget,
        body: &str,
    ) -> Result<CommentData, ForgeError> {
        let value = self
            .transport
            .patch(&Self::comment_path(repo, id, target), json!({ "body": body }))
            .await?;
        wire::comment(&value)
    }

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<BranchRef, ForgeError> {
        wire::branch(&self.transport.get(&paths::branch(repo, branch)).await?)
    }

    async fn compare_commits(
        &self,
        repo: &RepoId,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ForgeError> {
        wire::comparison(&self.transport.get(&paths::compare(repo, base, head)).await?)
    }

    async fn get_actor_kind(&self, login: &str) -> Result<ActorKind, ForgeError> {
        Ok(wire::actor_kind(&self.transport.get(&paths::user(login)).await?))
    }

    async fn get_permission(&self, repo: &RepoId, login: &str) -> Result<Permission, ForgeError> {
        Ok(wire::permission(
            &self.transport.get(&paths::permission(repo, login)).await?,
        ))
    }
}
