//! Reduced-capability forge client (Gitea API v1).
//!
//! No compare endpoint, no review-thread replies, and a user endpoint that
//! cannot be trusted to classify bots. Those operations report
//! `ForgeError::Unsupported` so callers fall back explicitly.

use async_trait::async_trait;
use forgehand_core::{
    ActorKind, BranchRef, CommentData, CommentTarget, Comparison, ForgeApi, ForgeError,
    IssueData, Permission, ProviderProfile, PullRequestData, RepoId, RepositoryInfo,
};
use serde_json::json;

use crate::paths;
use crate::transport::{AuthScheme, RestTransport};
use crate::wire;

pub struct GiteaClient {
    transport: RestTransport,
    profile: ProviderProfile,
}

impl GiteaClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, ForgeError> {
        Ok(Self {
            transport: RestTransport::new(api_url, token, AuthScheme::Token)?,
            profile: ProviderProfile::reduced(),
        })
    }

    fn issue_comment_path(repo: &RepoId, id: u64, target: CommentTarget) -> Result<String, ForgeError> {
        match target {
            CommentTarget::Issue => Ok(paths::issue_comment(repo, id)),
            CommentTarget::ReviewThread => Err(ForgeError::unsupported("review-thread comments")),
        }
    }
}

#[async_trait]
impl ForgeApi for GiteaClient {
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
        let path = format!("{}?limit=50", paths::issue_comments(repo, number));
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
        _repo: &RepoId,
        _pr_number: u64,
        _in_reply_to: u64,
        _body: &str,
    ) -> Result<CommentData, ForgeError> {
        Err(ForgeError::unsupported("review-thread replies"))
    }

    async fn get_comment(
        &self,
        repo: &RepoId,
        id: u64,
        target: CommentTarget,
    ) -> Result<CommentData, ForgeError> {
        let path = Self::issue_comment_path(repo, id, target)?;
        wire::comment(&self.transport.get(&path).await?)
    }

    async fn update_comment(
        &self,
        repo: &RepoId,
        id: u64,
        target: CommentTarget,
        body: &str,
    ) -> Result<CommentData, ForgeError> {
        let path = Self::issue_comment_path(repo, id, target)?;
        wire::comment(&self.transport.patch(&path, json!({ "body": body })).await?)
    }

    async fn get_branch(&self, repo: &RepoId, branch: &str) -> Result<BranchRef, ForgeError> {
        wire::branch(&self.transport.get(&paths::branch(repo, branch)).await?)
    }

    async fn compare_commits(
        &self,
        _repo: &RepoId,
        _base: &str,
        _head: &str,
    ) -> Result<Comparison, ForgeError> {
        Err(ForgeError::unsupported("compare"))
    }

    async fn get_actor_kind(&self, _login: &str) -> Result<ActorKind, ForgeError> {
        Err(ForgeError::unsupported("actor classification"))
    }

    async fn get_permission(&self, repo: &RepoId, login: &str) -> Result<Permission, ForgeError> {
        Ok(wire::permission(
            &self.transport.get(&paths::permission(repo, login)).await?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GiteaClient {
        GiteaClient::new("https://git.example.org/api/v1", "tok").unwrap()
    }

    #[tokio::test]
    async fn unsupported_operations_do_not_hit_the_network() {
        let c = client();
        let repo = RepoId::new("o", "r");
        assert!(matches!(
            c.compare_commits(&repo, "main", "x").await,
            Err(ForgeError::Unsupported { .. })
        ));
        assert!(matches!(
            c.create_review_reply(&repo, 1, 2, "b").await,
            Err(ForgeError::Unsupported { .. })
        ));
        assert!(matches!(
            c.get_actor_kind("alice").await,
            Err(ForgeError::Unsupported { .. })
        ));
        assert!(matches!(
            c.update_comment(&repo, 1, CommentTarget::ReviewThread, "b").await,
            Err(ForgeError::Unsupported { .. })
        ));
    }

    #[test]
    fn profile_is_reduced() {
        assert!(client().profile().is_reduced());
    }
}
